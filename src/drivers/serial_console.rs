use std::convert::Infallible;
use std::io::{self, Write};

/// Text console on the debug serial port.
///
/// Write errors are swallowed: a detached console must never stall a task.
pub struct SerialConsole {
    port: Box<dyn Write + Send>,
}

impl SerialConsole {
    pub fn new(port: impl Write + Send + 'static) -> Self {
        Self {
            port: Box::new(port),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn write_str(&mut self, s: &str) {
        self.port.write_all(s.as_bytes()).ok();
    }

    pub fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
        self.port.flush().ok();
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.port.write_all(&[byte]).ok();
    }

    // Debug helper - print hex value
    pub fn write_hex(&mut self, val: u8) {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        self.write_byte(HEX_CHARS[(val >> 4) as usize]);
        self.write_byte(HEX_CHARS[(val & 0xF) as usize]);
    }

    /// Big-endian hex dump of a 32-bit bitmask
    pub fn write_hex_u32(&mut self, val: u32) {
        for byte in val.to_be_bytes() {
            self.write_hex(byte);
        }
    }

    // Print formatted debug info
    pub fn debug(&mut self, msg: &str, val: u32) {
        self.write_str("[DBG] ");
        self.write_str(msg);
        self.write_str(": 0x");
        self.write_hex_u32(val);
        self.write_str("\r\n");
    }
}

impl ufmt::uWrite for SerialConsole {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        SerialConsole::write_str(self, s);
        Ok(())
    }
}
