use anyhow::Result;
use fanout_core::configs::TasksFileConfig;

pub fn execute() -> Result<()> {
    let schema = schemars::schema_for!(TasksFileConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
