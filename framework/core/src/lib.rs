mod error;
mod shutdown;

pub mod prelude {
    pub use crate::error::{ConfigError, LaunchError};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
}
