//! 没有扩展属性接口的平台

use super::AttrDriver;
use crate::error::{Error, ErrorKind, Result};
use crate::namespace::Namespace;
use crate::target::Target;

fn unsupported(target: &Target<'_>) -> Error {
    Error::new(
        ErrorKind::Unsupported,
        "extended attributes are not supported on this platform",
    )
    .with_target(target)
}

pub(crate) struct Unsupported;

impl AttrDriver for Unsupported {
    const IMPLEMENTATION: &'static str = "unsupported";

    fn list(target: &Target<'_>, _: Namespace) -> Result<Vec<Vec<u8>>> {
        Err(unsupported(target))
    }

    fn size(target: &Target<'_>, _: Namespace, _: &[u8]) -> Result<u64> {
        Err(unsupported(target))
    }

    fn get(target: &Target<'_>, _: Namespace, _: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(target))
    }

    fn set(target: &Target<'_>, _: Namespace, _: &[u8], _: &[u8]) -> Result<()> {
        Err(unsupported(target))
    }

    fn delete(target: &Target<'_>, _: Namespace, _: &[u8]) -> Result<()> {
        Err(unsupported(target))
    }
}
