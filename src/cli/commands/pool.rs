use anyhow::Result;

use super::{print_json, with_coordinator, Command, CommandContext};
use crate::priority::TaskPriority;

pub struct PoolCommand {
    context: CommandContext,
}

impl PoolCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

impl Command for PoolCommand {
    async fn execute(&self) -> Result<()> {
        let json = self.context.json;
        with_coordinator(&self.context, |coordinator| async move {
            let pool = coordinator.task_pool().await?;
            if json {
                return print_json(&pool);
            }

            println!("📋 TASK POOL ({} case(s))", pool.len());
            println!("────────────────────");
            for case in &pool {
                let marker = match TaskPriority::from_risk_tier(case.risk_tier) {
                    TaskPriority::High => "🔴",
                    TaskPriority::Normal => "🟠",
                };
                println!("{} {} {} [{}] - {}", marker, case.id, case.name, case.risk_tier, case.address);
            }
            Ok(())
        })
        .await
    }
}
