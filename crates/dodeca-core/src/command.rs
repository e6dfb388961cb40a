//! Line-based command protocol on the serial link.

use heapless::Vec;

/// Longest command kept; the rest of an overlong line is dropped.
pub const COMMAND_CAPACITY: usize = 64;

const IDENTIFY: &[u8] = b"id?";

/// A parsed request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `id?`: reply with the identification string.
    Identify,
    /// Any other line, including empty or garbled ones: sample all sensors.
    ReadSensors,
}

impl Command {
    /// Exact, case-sensitive match on `id?`. Everything else samples.
    pub fn parse(line: &[u8]) -> Self {
        if line == IDENTIFY {
            Command::Identify
        } else {
            Command::ReadSensors
        }
    }
}

/// Collects bytes into newline-terminated commands.
///
/// `\r` is ignored so both `\n` and `\r\n` line endings work.
#[derive(Debug, Default)]
pub struct CommandReader<const N: usize = COMMAND_CAPACITY> {
    buffer: Vec<u8, N>,
    complete: bool,
}

impl<const N: usize> CommandReader<N> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            complete: false,
        }
    }

    /// Feed one received byte. Returns the finished command when `byte`
    /// terminates it.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.complete {
            self.buffer.clear();
            self.complete = false;
        }

        match byte {
            b'\n' => {
                self.complete = true;
                Some(self.buffer.as_slice())
            }
            b'\r' => None,
            _ => {
                // Full buffer: drop until the terminator.
                let _ = self.buffer.push(byte);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<const N: usize>(
        reader: &mut CommandReader<N>,
        bytes: &[u8],
    ) -> Option<std::vec::Vec<u8>> {
        let mut last = None;
        for &b in bytes {
            if let Some(line) = reader.push(b) {
                last = Some(line.to_vec());
            }
        }
        last
    }

    #[test]
    fn identify_is_exact_and_case_sensitive() {
        assert_eq!(Command::parse(b"id?"), Command::Identify);
        assert_eq!(Command::parse(b"ID?"), Command::ReadSensors);
        assert_eq!(Command::parse(b"id? "), Command::ReadSensors);
        assert_eq!(Command::parse(b" id?"), Command::ReadSensors);
        assert_eq!(Command::parse(b"id"), Command::ReadSensors);
    }

    #[test]
    fn anything_else_reads_sensors() {
        assert_eq!(Command::parse(b"?"), Command::ReadSensors);
        assert_eq!(Command::parse(b""), Command::ReadSensors);
        assert_eq!(Command::parse(b"   "), Command::ReadSensors);
        assert_eq!(Command::parse(&[0xff, 0x00, 0x80]), Command::ReadSensors);
    }

    #[test]
    fn line_is_only_returned_on_newline() {
        let mut reader: CommandReader = CommandReader::new();
        assert_eq!(reader.push(b'i'), None);
        assert_eq!(reader.push(b'd'), None);
        assert_eq!(reader.push(b'?'), None);
        assert_eq!(reader.push(b'\n'), Some(&b"id?"[..]));
    }

    #[test]
    fn carriage_return_is_dropped() {
        let mut reader: CommandReader = CommandReader::new();
        assert_eq!(feed(&mut reader, b"id?\r\n"), Some(b"id?".to_vec()));
    }

    #[test]
    fn empty_line_is_a_command() {
        let mut reader: CommandReader = CommandReader::new();
        assert_eq!(feed(&mut reader, b"\n"), Some(std::vec::Vec::new()));
    }

    #[test]
    fn consecutive_lines_do_not_bleed() {
        let mut reader: CommandReader = CommandReader::new();
        assert_eq!(feed(&mut reader, b"abc\n"), Some(b"abc".to_vec()));
        assert_eq!(feed(&mut reader, b"id?\n"), Some(b"id?".to_vec()));
    }

    #[test]
    fn overlong_line_is_truncated() {
        let mut reader: CommandReader<4> = CommandReader::new();
        assert_eq!(feed(&mut reader, b"abcdefgh\n"), Some(b"abcd".to_vec()));
        assert_eq!(feed(&mut reader, b"id?\n"), Some(b"id?".to_vec()));
    }
}
