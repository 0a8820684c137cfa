use std::os::fd::RawFd;

const TAG_BIT: u32 = 0x8000_0000;

/// One descriptor plus its "is this a timer" tag, as packed into a
/// 32-bit half of an [`EventPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DescriptorTag {
    pub(crate) fd: RawFd,
    pub(crate) is_timer: bool,
}

/// The 64-bit value stashed in the kernel event structure's user-data
/// slot: the descriptor this particular kernel registration is for
/// (`primary`), and the descriptor it is paired with, if any (`extra`).
/// An unpaired registration stores itself as its own `extra`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EventPayload(u64);

impl EventPayload {
    pub(crate) fn new(primary: DescriptorTag, extra: Option<DescriptorTag>) -> EventPayload {
        let lo = pack(primary);
        let hi = pack(extra.unwrap_or(primary));
        EventPayload(((hi as u64) << 32) | lo as u64)
    }

    pub(crate) fn from_raw(raw: u64) -> EventPayload {
        EventPayload(raw)
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn primary(self) -> DescriptorTag {
        unpack(self.0 as u32)
    }

    pub(crate) fn extra(self) -> DescriptorTag {
        unpack((self.0 >> 32) as u32)
    }

    pub(crate) fn has_extra(self) -> bool {
        self.primary() != self.extra()
    }
}

fn pack(tag: DescriptorTag) -> u32 {
    assert!(tag.fd >= 0, "negative descriptor {}", tag.fd);
    let fd = tag.fd as u32;
    assert_eq!(
        fd & TAG_BIT,
        0,
        "descriptor {} overflows the event payload's tag bit",
        tag.fd
    );
    fd | if tag.is_timer { TAG_BIT } else { 0 }
}

fn unpack(half: u32) -> DescriptorTag {
    DescriptorTag {
        fd: (half & !TAG_BIT) as RawFd,
        is_timer: half & TAG_BIT != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unpaired() {
        let tag = DescriptorTag { fd: 7, is_timer: false };
        let payload = EventPayload::new(tag, None);
        assert_eq!(payload.primary(), tag);
        assert!(!payload.has_extra());
    }

    #[test]
    fn round_trips_paired() {
        let io = DescriptorTag { fd: 7, is_timer: false };
        let timer = DescriptorTag { fd: 12, is_timer: true };
        let payload = EventPayload::new(io, Some(timer));
        assert_eq!(payload.primary(), io);
        assert_eq!(payload.extra(), timer);
        assert!(payload.has_extra());
    }

    #[test]
    #[should_panic(expected = "overflows")]
    fn rejects_tag_bit_overflow() {
        let tag = DescriptorTag {
            fd: (TAG_BIT as RawFd) | 1,
            is_timer: false,
        };
        EventPayload::new(tag, None);
    }
}
