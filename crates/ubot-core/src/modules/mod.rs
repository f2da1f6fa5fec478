//! Built-in (static) command modules.

pub mod help;
pub mod janitor;
pub mod tags;

use crate::{commands::CommandRegistry, Result};

pub fn register_all(registry: &mut CommandRegistry) -> Result<()> {
    help::register(registry)?;
    tags::register(registry)?;
    janitor::register(registry)?;
    Ok(())
}
