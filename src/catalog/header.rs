use buff::Buff;

use crate::{config::MAGIC, error::{DbResult, Error}, ioutil::Serde};

/// Page 0. Carries the magic identifier and the page size used for every
/// other page in the file. Zero-padded to [`crate::config::HEADER_SIZE`]
/// bytes; everything past the magic and the page size is reserved.
#[derive(Debug, Clone, Copy)]
pub struct HeaderPage {
    pub page_size: u32,
}

impl Serde for HeaderPage {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()> {
        buf.write_slice(MAGIC);
        buf.write(self.page_size);
        Ok(())
    }

    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self> {
        let mut magic = [0u8; 8];
        buf.read_slice(&mut magic);
        if &magic != MAGIC {
            return Err(Error::InvalidState("header magic identifier mismatch"));
        }
        let page_size = buf.read();
        Ok(HeaderPage { page_size })
    }
}
