//! Artifact store backends.

mod filesystem;
mod remote;

pub use filesystem::FilesystemArtifactStore;
pub use remote::RemoteArtifactStore;
