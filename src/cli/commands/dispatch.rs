use anyhow::Result;

use super::{print_json, with_coordinator, Command, CommandContext};

pub struct DispatchCommand {
    context: CommandContext,
    agent: Option<String>,
    case: String,
}

impl DispatchCommand {
    pub fn new(context: CommandContext, agent: Option<String>, case: String) -> Self {
        Self {
            context,
            agent,
            case,
        }
    }
}

impl Command for DispatchCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        let agent = self.agent.as_deref();
        let case = self.case.as_str();
        with_coordinator(&self.context, |coordinator| async move {
            let task = coordinator.dispatch(agent, case).await?;
            if json {
                return print_json(&task);
            }

            println!(
                "✅ {} ({}) dispatched to {} as {} [{}]",
                task.debtor_name,
                task.debtor_id,
                agent.unwrap_or_default(),
                task.id,
                task.priority
            );
            for notice in coordinator.recent_notices() {
                println!("   📣 [{}] {}", notice.severity, notice.message);
            }
            Ok(())
        })
        .await
    }
}
