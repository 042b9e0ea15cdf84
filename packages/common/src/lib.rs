pub mod content;
pub mod error;
pub mod patch;
pub mod record;
pub mod visitor;

pub use content::*;
pub use error::*;
pub use patch::*;
pub use record::*;
pub use visitor::*;
