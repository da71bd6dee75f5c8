//! `tally config`

use tally::config::UpdateConfig;

pub fn run(config: &UpdateConfig) -> anyhow::Result<()> {
    let mut shown = config.clone();
    if shown.auth_token.is_some() {
        shown.auth_token = Some("********".to_string());
    }
    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}
