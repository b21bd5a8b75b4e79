//! Pipeline core: pure session/form controller and view-model helpers.
mod effect;
mod msg;
mod origin;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use origin::{ApiOrigin, OriginError, DEFAULT_API_ORIGIN};
pub use state::{
    AppState, ControllerConfig, Credential, FileAttachment, FormFields, LoginCredentials,
    OperationStatus, PluginType, ResultPayload, SessionState, Submission, UnknownPluginType,
    DEFAULT_REPO_URL,
};
pub use update::update;
pub use view_model::AppViewModel;
