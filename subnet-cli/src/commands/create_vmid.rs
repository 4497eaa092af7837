//! VM ID derivation command

use anyhow::{Context, Result};

use subnet_cli::Id;

use super::print_success;

/// Run the create vmid command
pub fn run(name: &str) -> Result<()> {
    let vm_id = Id::from_name(name).with_context(|| format!("Invalid VM name {:?}", name))?;
    print_success(&format!("Created VM ID {} from {:?}", vm_id, name));
    Ok(())
}
