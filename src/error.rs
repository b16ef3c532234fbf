use crate::registers::Registers;
use std::{convert::From, fmt};

/// Error type shared by the address space, clock, CPU core and monitor
pub struct Error {
    pub kind: ErrorKind,
    pub ctx: Option<Registers>,
    pub msg: String,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrorKind {
    /// malformed address space mapping or bad machine parameters
    Config,
    /// internal descriptor table inconsistency found while decoding
    Decode,
    /// a multi-byte opcode was forced onto the CPU (interrupt mode 0)
    ForcedOpcode,
    /// bad breakpoint condition or monitor request
    Monitor,
    /// underlying io error
    IO,
    /// catch-all for other errors
    General,
}

impl Error {
    pub fn new(kind: ErrorKind, ctx: Option<Registers>, message: &str) -> Error {
        Error {
            kind,
            ctx,
            msg: String::from(message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, None, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:?}): {}", red!("z80::Error"), self.kind, self.msg)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if let Some(ctx) = &self.ctx {
            write!(f, "\nContext: {}", ctx)?;
        }
        Ok(())
    }
}
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let mut regs = Registers::default();
        regs.pc = 0x1234;
        let e = Error::new(ErrorKind::Decode, Some(regs), "bad table");
        let s = e.to_string();
        assert!(s.starts_with("bad table"));
        assert!(s.contains("Context:"));
        assert!(s.contains("1234"));
    }

    #[test]
    fn io_errors_convert() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.kind, ErrorKind::IO);
        assert!(e.msg.contains("gone"));
    }
}
