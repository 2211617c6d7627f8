//! Wire format of one controller datagram.
//!
//! The controller sends UTF-8 text with nine comma-separated fields:
//! `x,y,sw,btnUp,btnLeft,btnDown,btnRight,pitch,roll`. The link is lossy
//! and unauthenticated, so anything that does not parse is treated as
//! noise and discarded without a log line.

/// One decoded controller/sensor reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControllerFrame {
    pub x: i32,
    pub y: i32,
    pub switch_pressed: bool,
    pub btn_up: bool,
    pub btn_left: bool,
    pub btn_down: bool,
    pub btn_right: bool,
    pub pitch: f32,
    pub roll: f32,
}

impl ControllerFrame {
    /// Decodes one datagram payload. Returns `None` for anything malformed:
    /// wrong field count, non-UTF-8 bytes, or unparseable numbers.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(payload).ok()?;
        let fields: Vec<&str> = text.trim().split(',').collect();
        if fields.len() != 9 {
            return None;
        }

        Some(Self {
            x: fields[0].parse().ok()?,
            y: fields[1].parse().ok()?,
            switch_pressed: fields[2] == "1",
            btn_up: fields[3] == "1",
            btn_left: fields[4] == "1",
            btn_down: fields[5] == "1",
            btn_right: fields[6] == "1",
            pitch: fields[7].parse().ok()?,
            roll: fields[8].parse().ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_frame() {
        let frame = ControllerFrame::decode(b"2048,512,1,0,1,0,0,12.5,-3.25").unwrap();
        assert_eq!(frame.x, 2048);
        assert_eq!(frame.y, 512);
        assert!(frame.switch_pressed);
        assert!(!frame.btn_up);
        assert!(frame.btn_left);
        assert!(!frame.btn_down);
        assert!(!frame.btn_right);
        assert!((frame.pitch - 12.5).abs() < f32::EPSILON);
        assert!((frame.roll + 3.25).abs() < f32::EPSILON);
    }

    #[test]
    fn tolerates_a_trailing_newline() {
        assert!(ControllerFrame::decode(b"0,0,0,0,0,0,0,0.0,0.0\n").is_some());
    }

    #[test]
    fn wrong_field_count_is_discarded() {
        assert!(ControllerFrame::decode(b"1,2,3").is_none());
        assert!(ControllerFrame::decode(b"0,0,0,0,0,0,0,0.0,0.0,extra").is_none());
        assert!(ControllerFrame::decode(b"").is_none());
    }

    #[test]
    fn unparseable_numbers_are_discarded() {
        assert!(ControllerFrame::decode(b"abc,0,0,0,0,0,0,0.0,0.0").is_none());
        assert!(ControllerFrame::decode(b"0,0,0,0,0,0,0,pitch,0.0").is_none());
    }

    #[test]
    fn non_utf8_payload_is_discarded() {
        assert!(ControllerFrame::decode(&[0xff, 0xfe, 0x2c]).is_none());
    }

    #[test]
    fn booleans_require_the_literal_one() {
        let frame = ControllerFrame::decode(b"0,0,2,true,yes,01,x,0.0,0.0").unwrap();
        assert!(!frame.switch_pressed);
        assert!(!frame.btn_up);
        assert!(!frame.btn_left);
        assert!(!frame.btn_down);
        assert!(!frame.btn_right);
    }
}
