// Library exports for the content-side <select> dropdown coordinator

pub mod control;
pub mod coordinator;
pub mod events;
pub mod markup;
pub mod preferences;
pub mod protocol;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod style;
pub mod timers;

// Re-export commonly used types for hosts and tests
pub use control::{ActorId, DocumentId, NodeId, SelectControl};
pub use coordinator::SelectCoordinator;
pub use events::{DocumentEvent, OpenSource};
pub use markup::{ControlEvent, MarkupSelect};
pub use preferences::Preferences;
pub use protocol::{InboundMessage, MessageChannel, OutboundMessage};
pub use session::SelectSession;
pub use snapshot::{build_option_list, OptionEntry, OptionList};
