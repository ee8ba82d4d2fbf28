use std::fmt;
use std::path::PathBuf;

/// Fingerprint of an entire candidate list, used only to name its checkpoint.
///
/// The digest covers the fingerprint algorithm name and every path's raw OS
/// bytes in the order given, each terminated by a NUL byte so that
/// `["ab", "c"]` and `["a", "bc"]` never share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentity(String);

impl RunIdentity {
    pub fn compute(algorithm: &str, candidates: &[PathBuf]) -> Self {
        let mut context = md5::Context::new();
        context.consume(algorithm.as_bytes());
        context.consume([0u8]);
        for path in candidates {
            context.consume(path.as_os_str().as_encoded_bytes());
            context.consume([0u8]);
        }
        Self(format!("{:x}", context.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
