pub mod openai;
pub mod pipeline;
pub mod realtime;
pub mod relay;
pub mod session;
pub mod session_id;
pub mod state;

pub use openai::{OpenAIClient, OpenAIError};
pub use pipeline::{Reply, ReplyError, ReplyPipeline, speaking_duration_secs};
pub use realtime::{RealtimeConnector, RealtimeError, RealtimeEvent, StreamHandle};
pub use relay::{RelayError, SignalingRelay};
pub use session::{AttachOutcome, Session, SessionRegistry};
pub use session_id::SessionIdGenerator;
pub use state::{CoreInitError, CoreState};
