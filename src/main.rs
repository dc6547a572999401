mod config;
mod display;
mod error;
mod parser;
mod source;
mod stats;
mod web;

use config::{parse_command, Command, Config};
use display::{print_pivot_set, write_table_csv_file};
use source::{read_history_file, AllocationSource};
use stats::StatisticsView;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(&args)?;
    let config = Config::from_env();

    match command {
        Command::Web { port } => {
            println!("Starting web server on port {}...", port);
            println!("Access the statistics at http://localhost:{}/stats", port);

            web::start_server(port, config).await?;
        }
        Command::Show { filter, history, csv_out } => {
            let source: Box<dyn AllocationSource> = match history {
                Some(path) => Box::new(read_history_file(&path)?),
                None => config.source(),
            };
            println!("Loading allocations from {}...", source.describe());

            let mut view = StatisticsView::new();
            if view.load_from(&*source).await.is_none() {
                return Err("no allocation history could be loaded".into());
            }
            println!(
                "Loaded {} allocations for {} teams",
                view.records().len(),
                view.teams().len()
            );

            let set = view.set_filter(filter);
            print_pivot_set(&set);

            if let Some(path) = csv_out {
                write_table_csv_file(&set.times, &path)?;
                println!("Match start times saved to {}", path.display());
            }
        }
    }

    Ok(())
}
