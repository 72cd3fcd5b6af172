//! Write interceptor that signs a body while it is being produced.

use std::io::{self, Write};

use axum::http::HeaderMap;

use crate::secret::Secret;
use crate::signature::{self, Accumulator, Signature};

struct Pending {
    accumulator: Accumulator,
    buffer: Vec<u8>,
}

/// Wraps the real output of a request body.
///
/// Every write is fed to the HMAC accumulator and kept in a side buffer;
/// nothing reaches the real output until [`SigningWriter::finish`] has set the
/// signature header, because headers cannot follow body bytes on the wire.
///
/// Without a secret the writer passes bytes straight through and `finish`
/// leaves the headers alone.
pub struct SigningWriter<W> {
    out: W,
    pending: Option<Pending>,
}

impl<W: Write> SigningWriter<W> {
    pub fn new(secret: Option<&Secret>, out: W) -> Self {
        let pending = secret.map(|secret| Pending {
            accumulator: Accumulator::new(secret),
            buffer: Vec::new(),
        });
        Self { out, pending }
    }

    /// Whether a signature will be produced.
    pub fn is_signing(&self) -> bool {
        self.pending.is_some()
    }

    /// Set `X-Hub-Signature` on `headers`, replacing any previous value, then
    /// write the buffered body to the real output in its original order.
    pub fn finish(self, headers: &mut HeaderMap) -> io::Result<(W, Option<Signature>)> {
        let Self { mut out, pending } = self;
        let Some(Pending {
            accumulator,
            buffer,
        }) = pending
        else {
            return Ok((out, None));
        };

        let signature = accumulator.finalize();
        headers.insert(signature::header_name(), signature.to_header_value());

        out.write_all(&buffer)?;
        out.flush()?;
        Ok((out, Some(signature)))
    }
}

impl<W: Write> Write for SigningWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.pending {
            Some(pending) => {
                pending.accumulator.update(buf);
                pending.buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => self.out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.pending {
            // Held back until the header is set.
            Some(_) => Ok(()),
            None => self.out.flush(),
        }
    }
}
