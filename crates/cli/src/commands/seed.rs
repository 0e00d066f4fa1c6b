use serde_json::json;
use transpak_core::pricing::format_usd;
use transpak_db::{connect_with_config, migrations, DemoDataset, SeedResult};

use crate::commands::{
    current_thread_runtime, load_config, CommandResult, EXIT_DATABASE, EXIT_MIGRATION, EXIT_SEED,
};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match current_thread_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED));
        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => {
            let data = json!({
                "quote_ids": seeded.quote_ids,
                "inserted": seeded.quotes,
                "skipped": seeded.skipped,
            });
            CommandResult::success_with_data("seed", summary(&seeded), Some(data))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    if seeded.quotes.is_empty() {
        return format!("demo dataset already present ({} quotes)", seeded.skipped);
    }

    let lines: Vec<String> = seeded
        .quotes
        .iter()
        .map(|quote| format!("  - {}: {}", quote.reference, format_usd(quote.total_cost)))
        .collect();
    format!("loaded {} demo quotes:\n{}", seeded.quotes.len(), lines.join("\n"))
}
