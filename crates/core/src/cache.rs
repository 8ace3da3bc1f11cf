//! Last-frame cache used for redraws.

/// A CPU-side copy of the last submitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

/// What the display last showed.
///
/// `GpuBound` and `Cpu` both mean "a frame exists", but only `Cpu` has
/// bytes a caller may read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FrameCache {
    #[default]
    Empty,
    Cpu(CachedFrame),
    /// A hardware framebuffer holds the picture; nothing is CPU-readable.
    GpuBound { width: u32, height: u32, pitch: usize },
}

impl FrameCache {
    pub fn is_empty(&self) -> bool {
        matches!(self, FrameCache::Empty)
    }

    /// True when the cached picture lives in a bound hardware framebuffer
    pub fn has_valid_framebuffer(&self) -> bool {
        matches!(self, FrameCache::GpuBound { .. })
    }

    /// Width, height and pitch of the cached frame
    pub fn metadata(&self) -> Option<(u32, u32, usize)> {
        match self {
            FrameCache::Empty => None,
            FrameCache::Cpu(frame) => Some((frame.width, frame.height, frame.pitch)),
            FrameCache::GpuBound {
                width,
                height,
                pitch,
            } => Some((*width, *height, *pitch)),
        }
    }

    /// CPU bytes, if there are any
    pub fn cpu_data(&self) -> Option<&[u8]> {
        match self {
            FrameCache::Cpu(frame) => Some(&frame.data),
            _ => None,
        }
    }

    /// Record a CPU frame, reusing the existing allocation when possible
    pub fn record_cpu(&mut self, data: &[u8], width: u32, height: u32, pitch: usize) {
        let len = pitch
            .checked_mul(height as usize)
            .map_or(data.len(), |n| n.min(data.len()));
        match self {
            FrameCache::Cpu(frame) => {
                frame.data.clear();
                frame.data.extend_from_slice(&data[..len]);
                frame.width = width;
                frame.height = height;
                frame.pitch = pitch;
            }
            _ => {
                *self = FrameCache::Cpu(CachedFrame {
                    data: data[..len].to_vec(),
                    width,
                    height,
                    pitch,
                });
            }
        }
    }

    pub fn record_gpu(&mut self, width: u32, height: u32, pitch: usize) {
        *self = FrameCache::GpuBound {
            width,
            height,
            pitch,
        };
    }

    pub fn clear(&mut self) {
        *self = FrameCache::Empty;
    }

    /// Forget a frame held by a hardware framebuffer that no longer exists.
    /// CPU copies are kept. Returns whether anything was dropped.
    pub fn drop_gpu_binding(&mut self) -> bool {
        if self.has_valid_framebuffer() {
            self.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_has_no_metadata() {
        let cache = FrameCache::default();
        assert!(cache.is_empty());
        assert!(cache.metadata().is_none());
        assert!(cache.cpu_data().is_none());
        assert!(!cache.has_valid_framebuffer());
    }

    #[test]
    fn test_record_cpu_reuses_buffer() {
        let mut cache = FrameCache::default();
        cache.record_cpu(&[1u8; 64], 4, 4, 16);
        let capacity = match &cache {
            FrameCache::Cpu(frame) => frame.data.capacity(),
            _ => panic!("expected cpu frame"),
        };

        cache.record_cpu(&[2u8; 32], 2, 4, 8);
        assert_eq!(cache.metadata(), Some((2, 4, 8)));
        assert_eq!(cache.cpu_data(), Some(&[2u8; 32][..]));
        match &cache {
            FrameCache::Cpu(frame) => assert_eq!(frame.data.capacity(), capacity),
            _ => panic!("expected cpu frame"),
        }
    }

    #[test]
    fn test_gpu_frame_is_not_cpu_readable() {
        let mut cache = FrameCache::default();
        cache.record_cpu(&[0u8; 16], 2, 2, 8);
        cache.record_gpu(640, 480, 2560);
        assert!(cache.has_valid_framebuffer());
        assert!(cache.cpu_data().is_none());
        assert_eq!(cache.metadata(), Some((640, 480, 2560)));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dropping_gpu_binding_keeps_cpu_frames() {
        let mut cache = FrameCache::default();
        cache.record_gpu(640, 480, 0);
        assert!(cache.drop_gpu_binding());
        assert!(cache.is_empty());
        assert!(!cache.drop_gpu_binding());

        cache.record_cpu(&[1u8; 16], 2, 2, 8);
        assert!(!cache.drop_gpu_binding());
        assert_eq!(cache.metadata(), Some((2, 2, 8)));
    }

    #[test]
    fn test_record_cpu_with_oversized_geometry_copies_what_exists() {
        let mut cache = FrameCache::default();
        cache.record_cpu(&[3u8; 12], 1, u32::MAX, usize::MAX);
        assert_eq!(cache.cpu_data().map(<[u8]>::len), Some(12));
    }
}
