use actix_web::{web, App, HttpServer, HttpResponse, Result, HttpRequest, middleware};
use log::{error, info};
use serde::Deserialize;
use std::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::display::render_html;
use crate::parser::{parse_allocations_json, read_allocations_csv};
use crate::source::{read_output_dir, AllocationSource};
use crate::stats::pivot::build;
use crate::stats::{group_roster_by_age_group, Filter, RosterTeam, StatisticsView};

pub struct AppState {
    pub view: Mutex<StatisticsView>,
    pub source: Box<dyn AllocationSource>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, source: Box<dyn AllocationSource>, view: StatisticsView) -> Self {
        AppState {
            view: Mutex::new(view),
            source,
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct FilterRequest {
    team: Filter,
}

#[derive(Deserialize)]
pub struct TeamQuery {
    team: Option<String>,
}

fn lock_view(state: &AppState) -> Result<MutexGuard<'_, StatisticsView>> {
    state
        .view
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("statistics view unavailable"))
}

// Raw allocation history, as read from the output directory
async fn get_statistics(state: web::Data<AppState>) -> Result<HttpResponse> {
    let dir = state.config.output_dir.clone();
    match web::block(move || read_output_dir(&dir)).await? {
        Ok(allocations) => Ok(HttpResponse::Ok().json(serde_json::json!({ "allocations": allocations }))),
        Err(e) => {
            error!("Failed to fetch statistics data: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Failed to fetch statistics data."})))
        }
    }
}

async fn get_pivot(state: web::Data<AppState>) -> Result<HttpResponse> {
    let view = lock_view(&state)?;
    Ok(HttpResponse::Ok().json(view.pivot()))
}

async fn set_filter(
    req: web::Json<FilterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut view = lock_view(&state)?;
    let set = view.set_filter(req.into_inner().team);
    Ok(HttpResponse::Ok().json(set))
}

async fn get_teams(state: web::Data<AppState>) -> Result<HttpResponse> {
    let view = lock_view(&state)?;
    Ok(HttpResponse::Ok().json(view.teams()))
}

// Reload from the configured source; the view is not locked while fetching
async fn reload(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ticket = lock_view(&state)?.begin_load();
    info!("Reloading statistics from {}", state.source.describe());
    let result = state.source.fetch().await;

    let mut view = lock_view(&state)?;
    let failure = result.as_ref().err().map(|e| e.to_string());
    match view.finish_load(ticket, result) {
        Some(set) => Ok(HttpResponse::Ok().json(set)),
        None => match failure {
            Some(message) if view.is_current(ticket) => Ok(HttpResponse::BadGateway()
                .json(serde_json::json!({"success": false, "error": message}))),
            _ => Ok(HttpResponse::Conflict().json(
                serde_json::json!({"success": false, "error": "Superseded by a newer reload"}),
            )),
        },
    }
}

// Admin upload of an allocation history (CSV, or JSON when sent as application/json)
async fn admin_upload(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    // Check password from header
    let password = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if password != state.config.admin_password {
        return Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    let is_json = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    let parsed = if is_json {
        parse_allocations_json(&body)
    } else {
        read_allocations_csv(&body[..])
    };

    match parsed {
        Ok(raw) => {
            let mut view = lock_view(&state)?;
            let ticket = view.begin_load();
            view.finish_load(ticket, Ok(raw));

            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!("Loaded {} allocations", view.records().len())
            })))
        }
        Err(e) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": format!("Failed to process upload: {}", e)
        }))),
    }
}

async fn group_roster(roster: web::Json<Vec<RosterTeam>>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(group_roster_by_age_group(&roster)))
}

// HTML statistics page, rendered server side; `?team=` only applies to this
// response, the shared filter is changed through /api/statistics/filter
async fn stats_page(
    query: web::Query<TeamQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let view = lock_view(&state)?;
    let filter = match &query.team {
        Some(team) => Filter::from(team.as_str()),
        None => view.filter().clone(),
    };
    let set = build(view.records(), &filter);
    let html = render_html(&set, &filter, view.teams());
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(stats_page))
        .route("/stats", web::get().to(stats_page))
        .route("/api/statistics", web::get().to(get_statistics))
        .route("/api/statistics/pivot", web::get().to(get_pivot))
        .route("/api/statistics/filter", web::post().to(set_filter))
        .route("/api/statistics/reload", web::post().to(reload))
        .route("/api/teams", web::get().to(get_teams))
        .route("/api/upload", web::post().to(admin_upload))
        .route("/api/roster/grouped", web::post().to(group_roster));
}

pub async fn start_server(port: u16, config: Config) -> std::io::Result<()> {
    let source = config.source();

    // First fetch + build before accepting requests
    let mut view = StatisticsView::new();
    view.load_from(&*source).await;

    let app_state = web::Data::new(AppState::new(config, source, view));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use crate::source::StaticSource;
    use serde_json::{json, Value};

    fn config(dir: &std::path::Path) -> Config {
        Config {
            output_dir: dir.to_path_buf(),
            source_url: None,
            admin_password: "pw".to_string(),
        }
    }

    fn history() -> Vec<Value> {
        vec![
            json!({"team": "U10 Bears", "date": "2024-05-05", "pitch": "PitchA", "time": "10:00:00", "preferred": true}),
            json!({"team": "U8 Owls", "date": "2024-05-12", "pitch": "PitchB", "time": "09:00:00", "preferred": false}),
        ]
    }

    async fn loaded_state(dir: &std::path::Path) -> web::Data<AppState> {
        let source: Box<dyn AllocationSource> = Box::new(StaticSource::new(history()));
        let mut view = StatisticsView::new();
        view.load_from(&*source).await;
        web::Data::new(AppState::new(config(dir), source, view))
    }

    #[actix_web::test]
    async fn filter_endpoint_narrows_rows() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/statistics/filter")
            .set_json(json!({"team": "U10 Bears"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["times"]["row_labels"], json!(["U10 Bears"]));
        assert_eq!(body["times"]["column_labels"], json!(["2024-05-05", "2024-05-12"]));
        assert_eq!(body["times"]["cells"][0][0], json!({"value": "10:00", "preferred": true}));
        assert_eq!(body["start_frequency"]["cells"], json!([[0, 1]]));

        let req = test::TestRequest::get().uri("/api/statistics/pivot").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pitches"]["row_labels"], json!(["U10 Bears"]));
    }

    #[actix_web::test]
    async fn upload_requires_password() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_payload("team,date,pitch,time\nU7 Cubs,2024-06-01,PitchC,08:30\n")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn csv_upload_replaces_records() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("X-Admin-Password", "pw"))
            .set_payload("team,date,pitch,time\nU7 Cubs,2024-06-01,PitchC,08:30\nno date row,,PitchC,08:30\n")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Loaded 1 allocations"));

        let req = test::TestRequest::get().uri("/api/teams").to_request();
        let teams: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(teams, json!(["U7 Cubs"]));
    }

    #[actix_web::test]
    async fn reload_reads_configured_source() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(AppState::new(
            config(dir.path()),
            Box::new(StaticSource::new(history())),
            StatisticsView::new(),
        ));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post().uri("/api/statistics/reload").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pitch_usage"]["row_labels"], json!(["U8 Owls", "U10 Bears"]));
    }

    #[actix_web::test]
    async fn raw_statistics_from_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("2024-05-05.txt"),
            "10:00 - U10 Bears - 7v7 - PitchA - True\n",
        )
        .unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/statistics").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body["allocations"],
            json!([{"date": "2024-05-05", "time": "10:00", "team": "U10 Bears", "pitch": "PitchA", "preferred": true}])
        );
    }

    #[actix_web::test]
    async fn missing_output_dir_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(loaded_state(&dir.path().join("gone")).await)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/statistics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn roster_groups_in_age_order() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/roster/grouped")
            .set_json(json!([
                {"id": 3, "display_name": "U12 Hawks"},
                {"id": 1, "display_name": "U8 Owls"},
                {"id": 2, "display_name": "U10 Bears"}
            ]))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = std::str::from_utf8(&body).unwrap();

        let u8_at = text.find("\"U8\"").unwrap();
        let u10_at = text.find("\"U10\"").unwrap();
        let u12_at = text.find("\"U12\"").unwrap();
        assert!(u8_at < u10_at && u10_at < u12_at);
        assert!(text.contains("\"id\":1"));
    }

    #[actix_web::test]
    async fn stats_page_applies_team_query() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::get().uri("/stats?team=U8%20Owls").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let html = std::str::from_utf8(&body).unwrap();

        assert!(html.contains("<option value=\"U8 Owls\" selected>U8 Owls</option>"));
        assert!(html.contains("<tr><td>U8 Owls</td>"));
        assert!(!html.contains("<tr><td>U10 Bears</td>"));
    }

    #[actix_web::test]
    async fn stats_page_query_leaves_shared_filter_alone() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(loaded_state(dir.path()).await).configure(configure)).await;

        let req = test::TestRequest::get().uri("/stats?team=NoSuchTeam").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("<tr><td>NoSuchTeam</td>"));

        let req = test::TestRequest::get().uri("/api/statistics/pivot").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["times"]["row_labels"], json!(["U8 Owls", "U10 Bears"]));

        let req = test::TestRequest::get().uri("/stats").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("<tr><td>U10 Bears</td>"));
        assert!(!html.contains("NoSuchTeam"));
    }
}
