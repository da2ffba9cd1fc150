use anyhow::Result;

use super::status::render_agent;
use super::{print_json, with_coordinator, Command, CommandContext};

pub struct VerifyCommand {
    context: CommandContext,
    agent: String,
}

impl VerifyCommand {
    pub fn new(context: CommandContext, agent: String) -> Self {
        Self { context, agent }
    }
}

impl Command for VerifyCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        let agent = self.agent.as_str();
        with_coordinator(&self.context, |coordinator| async move {
            coordinator.begin_verification(agent).await?;
            let photo = match coordinator.capture_verification(agent).await {
                Ok(photo) => photo,
                Err(e) => {
                    coordinator.cancel_verification(agent).await?;
                    return Err(e.into());
                }
            };
            coordinator.confirm_verification(agent, &photo).await?;

            let view = coordinator.agent_view(agent).await?;
            if json {
                return print_json(&view);
            }
            println!("📸 Identity confirmed for {} (photo {})", agent, photo);
            println!("{}", render_agent(&view));
            Ok(())
        })
        .await
    }
}
