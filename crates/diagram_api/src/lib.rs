//! Request API crate.
//! Plain function-call surface over `diagram_core` with envelope results.

pub mod api;
pub mod response;

pub use api::{core_version, ping, DiagramApi};
pub use response::{
    ActionResponse, DeleteResponse, EditRightsResponse, EditStatusResponse, LinkEndInput,
    LinkEndResponse, LinkEndsResponse, LinkListResponse, LinkResponse, LinkUpdate,
    NodeListResponse, NodeResponse, NodeUpdate, SequenceResponse,
};
