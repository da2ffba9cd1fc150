use anyhow::Result;

use super::{print_json, with_coordinator, Command, CommandContext};
use crate::view::FieldAgentView;

pub struct StatusCommand {
    context: CommandContext,
}

impl StatusCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

pub fn render_agent(view: &FieldAgentView) -> String {
    match view {
        FieldAgentView::Live(agent) => format!(
            "🟢 {} {} - {} @ ({:.4}, {:.4}) 🔋{}% 📶{}% - {} open task(s)",
            agent.id,
            agent.name,
            agent.status,
            agent.location.lat,
            agent.location.lng,
            agent.battery_level,
            agent.signal_strength,
            agent.itinerary.open_tasks
        ),
        FieldAgentView::Locked(agent) => format!(
            "🔒 {} {} - [{}] - {} open task(s)",
            agent.id, agent.name, agent.placeholder, agent.itinerary.open_tasks
        ),
    }
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        with_coordinator(&self.context, |coordinator| async move {
            let agents = coordinator.list_agents().await;
            if json {
                return print_json(&agents);
            }

            println!("🛰️  FIELD AGENT STATUS");
            println!("======================");
            println!();
            for view in &agents {
                println!("{}", render_agent(view));
            }
            println!();
            let locked = agents.iter().filter(|v| v.is_locked()).count();
            println!("💼 {} agent(s), {} awaiting identity verification", agents.len(), locked);
            Ok(())
        })
        .await
    }
}
