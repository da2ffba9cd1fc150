use anyhow::Result;

use super::{print_json, with_coordinator, Command, CommandContext};

pub struct OptimizeCommand {
    context: CommandContext,
    agent: Option<String>,
}

impl OptimizeCommand {
    pub fn new(context: CommandContext, agent: Option<String>) -> Self {
        Self { context, agent }
    }
}

impl Command for OptimizeCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        let agent = self.agent.as_deref();
        with_coordinator(&self.context, |coordinator| async move {
            let itinerary = coordinator.optimize_route(agent).await?;
            if json {
                return print_json(&itinerary);
            }

            println!("🗺️  OPTIMIZED ROUTE for {}", agent.unwrap_or_default());
            println!("────────────────────");
            for (stop, task) in itinerary.iter().enumerate() {
                let eta = task
                    .eta_minutes
                    .map(|m| format!("~{m} min"))
                    .unwrap_or_else(|| "no geocode".to_string());
                println!(
                    "{:>2}. {} {} [{}] {} - {}",
                    stop + 1,
                    task.debtor_id,
                    task.debtor_name,
                    task.status,
                    eta,
                    task.address
                );
            }
            Ok(())
        })
        .await
    }
}
