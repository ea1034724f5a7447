pub mod appointment;
pub mod backend;
pub mod message;
pub mod outcome;
pub mod tool;

pub use appointment::{AppointmentRequest, ContactContext, DEFAULT_SERVICE_TYPE};
pub use backend::{BackendReply, SmartAppointmentPayload, Store, Therapist, TherapistQuery};
pub use message::{ActiveChat, InboundMessage, Message, Role};
pub use outcome::{BookingErrorKind, BookingOutcome, Confirmation};
pub use tool::{ToolCall, ToolCallResult, ToolDefinition, ToolResult};
