// MPEG audio frame header decoding

use crate::error::{Result, SplitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    /// Unofficial extension, recognised only to be rejected
    Mpeg2_5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

/// Bitrates in kbit/s. Index 0 (free) and 15 (bad) are zero and rejected.
const BITRATES: [[u32; 16]; 5] = [
    // MPEG1 Layer I
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
    // MPEG1 Layer II
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
    // MPEG1 Layer III
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    // MPEG2 Layer I
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    // MPEG2 Layer II and III
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
];

impl MpegVersion {
    fn sample_rates(&self) -> [u32; 3] {
        match self {
            MpegVersion::Mpeg1 => [44100, 48000, 32000],
            MpegVersion::Mpeg2 => [22050, 24000, 16000],
            MpegVersion::Mpeg2_5 => [11025, 12000, 8000],
        }
    }

    fn bitrate_group(&self, layer: Layer) -> usize {
        match (self, layer) {
            (MpegVersion::Mpeg1, Layer::Layer1) => 0,
            (MpegVersion::Mpeg1, Layer::Layer2) => 1,
            (MpegVersion::Mpeg1, Layer::Layer3) => 2,
            (_, Layer::Layer1) => 3,
            (_, _) => 4,
        }
    }
}

/// Decoded 4-byte MPEG audio frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpegFrameHeader {
    pub raw: [u8; 4],
    pub version: MpegVersion,
    pub layer: Layer,
    pub protected: bool,
    /// kbit/s
    pub bitrate: u32,
    /// Hz
    pub sample_rate: u32,
    pub samples_per_frame: u32,
    pub padded: bool,
    pub channel_mode: ChannelMode,
    /// Whole frame, header included
    pub frame_size: usize,
    /// Where a VBR marker sits in the payload, right after the side information
    pub vbr_offset: usize,
}

impl MpegFrameHeader {
    pub const SIZE: usize = 4;

    /// `Ok(None)` when the bytes are not a usable frame header. MPEG 2.5
    /// headers are an error: the frame is real but cannot be measured.
    pub fn parse(buf: &[u8; Self::SIZE]) -> Result<Option<Self>> {
        // AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
        if buf[0] != 0xFF || buf[1] & 0xE0 != 0xE0 {
            return Ok(None);
        }

        let version = match (buf[1] >> 3) & 0b11 {
            0b00 => MpegVersion::Mpeg2_5,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return Ok(None),
        };
        let layer = match (buf[1] >> 1) & 0b11 {
            0b01 => Layer::Layer3,
            0b10 => Layer::Layer2,
            0b11 => Layer::Layer1,
            _ => return Ok(None),
        };
        let protected = buf[1] & 1 == 0;

        let bitrate = BITRATES[version.bitrate_group(layer)][(buf[2] >> 4) as usize];
        if bitrate == 0 {
            return Ok(None);
        }
        let rate_index = ((buf[2] >> 2) & 0b11) as usize;
        if rate_index == 3 {
            return Ok(None);
        }
        let sample_rate = version.sample_rates()[rate_index];
        let padded = buf[2] & 0b10 != 0;

        let channel_mode = match buf[3] >> 6 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };

        if version == MpegVersion::Mpeg2_5 {
            return Err(SplitError::Unsupported("MPEG 2.5 audio frames".to_string()));
        }

        let samples_per_frame = match (layer, version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer3, MpegVersion::Mpeg2) => 576,
            _ => 1152,
        };
        let frame_size =
            (samples_per_frame * 125 * bitrate / sample_rate) as usize + usize::from(padded);
        if frame_size <= Self::SIZE {
            return Ok(None);
        }

        let mono = channel_mode == ChannelMode::SingleChannel;
        let vbr_offset = match (version, mono) {
            (MpegVersion::Mpeg1, false) => 32,
            (MpegVersion::Mpeg1, true) => 17,
            (_, false) => 17,
            (_, true) => 9,
        };

        Ok(Some(MpegFrameHeader {
            raw: *buf,
            version,
            layer,
            protected,
            bitrate,
            sample_rate,
            samples_per_frame,
            padded,
            channel_mode,
            frame_size,
            vbr_offset,
        }))
    }

    /// Bytes following the 4 header bytes
    pub fn payload_len(&self) -> usize {
        self.frame_size - Self::SIZE
    }

    /// True when `payload` carries a "Xing" or "Info" marker at this
    /// header's VBR offset.
    pub fn is_vbr_marker(&self, payload: &[u8]) -> bool {
        payload
            .get(self.vbr_offset..self.vbr_offset + 4)
            .map_or(false, |marker| marker == b"Xing" || marker == b"Info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: [u8; 4]) -> Option<MpegFrameHeader> {
        MpegFrameHeader::parse(&bytes).unwrap()
    }

    #[test]
    fn test_mpeg1_layer3_128k() {
        let header = parse([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.layer, Layer::Layer3);
        assert!(!header.protected);
        assert_eq!(header.bitrate, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.samples_per_frame, 1152);
        assert!(!header.padded);
        assert_eq!(header.channel_mode, ChannelMode::Stereo);
        assert_eq!(header.frame_size, 417);
        assert_eq!(header.payload_len(), 413);
        assert_eq!(header.vbr_offset, 32);
    }

    #[test]
    fn test_padding_and_channel_mode() {
        let header = parse([0xFF, 0xFB, 0x92, 0xC0]).unwrap();
        assert!(header.padded);
        assert_eq!(header.frame_size, 418);
        assert_eq!(header.channel_mode, ChannelMode::SingleChannel);
        assert_eq!(header.vbr_offset, 17);

        let joint = parse([0xFF, 0xFB, 0x90, 0x40]).unwrap();
        assert_eq!(joint.channel_mode, ChannelMode::JointStereo);
        assert_eq!(joint.vbr_offset, 32);
    }

    #[test]
    fn test_mpeg2_layer3() {
        let header = parse([0xFF, 0xF3, 0x80, 0xC0]).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg2);
        assert_eq!(header.bitrate, 64);
        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.samples_per_frame, 576);
        assert_eq!(header.frame_size, 208);
        assert_eq!(header.vbr_offset, 9);
    }

    #[test]
    fn test_rejections() {
        // no sync
        assert!(parse([0xFE, 0xFB, 0x90, 0x00]).is_none());
        assert!(parse([0xFF, 0x1B, 0x90, 0x00]).is_none());
        // reserved version
        assert!(parse([0xFF, 0xEB, 0x90, 0x00]).is_none());
        // reserved layer
        assert!(parse([0xFF, 0xF9, 0x90, 0x00]).is_none());
        // free and bad bitrates
        assert!(parse([0xFF, 0xFB, 0x00, 0x00]).is_none());
        assert!(parse([0xFF, 0xFB, 0xF0, 0x00]).is_none());
        // reserved sample rate
        assert!(parse([0xFF, 0xFB, 0x9C, 0x00]).is_none());
    }

    #[test]
    fn test_mpeg25_is_unsupported() {
        let err = MpegFrameHeader::parse(&[0xFF, 0xE3, 0x90, 0x00]).unwrap_err();
        assert!(matches!(err, SplitError::Unsupported(_)));
    }

    #[test]
    fn test_vbr_marker() {
        let header = parse([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        let mut payload = vec![0u8; header.payload_len()];
        assert!(!header.is_vbr_marker(&payload));
        payload[32..36].copy_from_slice(b"Info");
        assert!(header.is_vbr_marker(&payload));
        payload[32..36].copy_from_slice(b"Xing");
        assert!(header.is_vbr_marker(&payload));
        assert!(!header.is_vbr_marker(&payload[..34]));
    }
}
