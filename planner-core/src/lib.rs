/// Core trip-planning logic shared by the HTTP server and its tests.
/// Nothing in here touches the network: prompts go out as strings,
/// model output comes back as strings, and the session reducer returns
/// the backend calls to perform as data.

pub mod error;
pub mod extract;
pub mod form;
pub mod model;
pub mod prompt;
pub mod session;

pub use error::{PlanningError, Rejection, Stage, ValidationError};
pub use model::{PreferenceRecord, Recommendation};
pub use session::{Effect, Intent, SessionState, SessionView, Transition, View, reduce};
