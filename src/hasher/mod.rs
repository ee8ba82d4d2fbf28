pub mod digest;
pub mod identity;

pub use digest::{fingerprinter_for, ContentDigest, Fingerprinter, Md5Fingerprinter, Sha256Fingerprinter};
pub use identity::RunIdentity;
