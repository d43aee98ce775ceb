//! Recording events handed from the audio thread to the consumer.

use crate::model::TrackId;
use midi_msg::{Channel, ChannelVoiceMsg};

use std::panic::Location;

/// MIDI channel message with a frame offset into the processing cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Offset within the current cycle (0 = first frame of the cycle).
    pub frame_offset: u32,
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(frame_offset: u32, channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self {
            frame_offset,
            channel,
            msg,
        }
    }

    #[inline]
    pub fn note_on(frame_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            frame_offset,
            Channel::from_u8(channel),
            ChannelVoiceMsg::NoteOn { note, velocity },
        )
    }

    #[inline]
    pub fn note_off(frame_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            frame_offset,
            Channel::from_u8(channel),
            ChannelVoiceMsg::NoteOff { note, velocity },
        )
    }

    #[inline]
    pub fn control_change(frame_offset: u32, channel: u8, control: u8, value: u8) -> Self {
        Self::new(
            frame_offset,
            Channel::from_u8(channel),
            ChannelVoiceMsg::ControlChange {
                control: midi_msg::ControlChange::CC { control, value },
            },
        )
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    /// Note-on with non-zero velocity.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOn { velocity, .. } if velocity > 0)
    }

    /// Note-off, or note-on with velocity 0.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.msg,
            ChannelVoiceMsg::NoteOff { .. } | ChannelVoiceMsg::NoteOn { velocity: 0, .. }
        )
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. } | ChannelVoiceMsg::NoteOff { note, .. } => {
                Some(note)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { velocity, .. }
            | ChannelVoiceMsg::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }
}

/// Frame range a recording event covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CycleTime {
    /// Absolute transport frame of the first covered frame
    /// (cycle start + `local_offset`).
    pub global_start_frame: u64,
    /// Offset of the first covered frame inside the processing cycle.
    pub local_offset: u32,
    pub frame_count: u32,
}

impl CycleTime {
    #[inline]
    pub const fn new(global_start_frame: u64, local_offset: u32, frame_count: u32) -> Self {
        Self {
            global_start_frame,
            local_offset,
            frame_count,
        }
    }

    /// Zero-length range used by pause events.
    #[inline]
    pub const fn at(global_start_frame: u64, local_offset: u32) -> Self {
        Self::new(global_start_frame, local_offset, 0)
    }

    /// One past the last covered frame.
    #[inline]
    pub const fn end_frame(&self) -> u64 {
        self.global_start_frame + self.frame_count as u64
    }

    /// `local_offset + frame_count`, the end of the range inside the cycle.
    #[inline]
    pub const fn local_end(&self) -> u32 {
        self.local_offset + self.frame_count
    }

    /// Absolute position of a frame offset inside the cycle.
    #[inline]
    pub fn absolute(&self, cycle_offset: u32) -> u64 {
        self.global_start_frame + cycle_offset.saturating_sub(self.local_offset) as u64
    }

    #[inline]
    pub fn contains_offset(&self, cycle_offset: u32) -> bool {
        cycle_offset >= self.local_offset && cycle_offset < self.local_end()
    }
}

/// What happened, with the payload that belongs to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordingEventKind {
    StartTrackRecording,
    StartAutomationRecording { lane: u32 },
    /// MIDI captured in the cycle, `None` when the cycle had none.
    Midi(Option<MidiEvent>),
    /// Audio captured in the cycle; samples live in the event buffers.
    Audio,
    Automation { lane: u32, value: f32, touching: bool },
    PauseTrackRecording,
    PauseAutomationRecording { lane: u32 },
    StopTrackRecording,
    StopAutomationRecording { lane: u32 },
}

impl RecordingEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartTrackRecording => "start-track",
            Self::StartAutomationRecording { .. } => "start-automation",
            Self::Midi(_) => "midi",
            Self::Audio => "audio",
            Self::Automation { .. } => "automation",
            Self::PauseTrackRecording => "pause-track",
            Self::PauseAutomationRecording { .. } => "pause-automation",
            Self::StopTrackRecording => "stop-track",
            Self::StopAutomationRecording { .. } => "stop-automation",
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(
            self,
            Self::PauseTrackRecording | Self::PauseAutomationRecording { .. }
        )
    }

    /// Automation lane addressed by this event, if any.
    pub fn lane(&self) -> Option<u32> {
        match *self {
            Self::StartAutomationRecording { lane }
            | Self::Automation { lane, .. }
            | Self::PauseAutomationRecording { lane }
            | Self::StopAutomationRecording { lane } => Some(lane),
            _ => None,
        }
    }
}

/// Borrowed stereo processor output for one cycle.
///
/// Slices are indexed by cycle offset; the event copies
/// `[local_offset, local_offset + frame_count)`.
#[derive(Debug, Clone, Copy)]
pub struct StereoInput<'a> {
    pub left: &'a [f32],
    pub right: &'a [f32],
}

impl<'a> StereoInput<'a> {
    pub fn new(left: &'a [f32], right: &'a [f32]) -> Self {
        Self { left, right }
    }

    /// Same buffer on both channels.
    pub fn mono(samples: &'a [f32]) -> Self {
        Self::new(samples, samples)
    }
}

/// A pooled recording event.
///
/// Audio buffers are allocated once with the pool and reused; `populate`
/// only copies into them.
pub struct RecordingEvent {
    kind: RecordingEventKind,
    track: TrackId,
    time: CycleTime,
    left: Box<[f32]>,
    right: Box<[f32]>,
    #[cfg(debug_assertions)]
    origin: Option<&'static Location<'static>>,
}

impl RecordingEvent {
    /// Allocate an event able to carry `max_block_length` frames of audio.
    pub fn with_block_length(max_block_length: usize) -> Self {
        Self {
            kind: RecordingEventKind::StopTrackRecording,
            track: TrackId(0),
            time: CycleTime::default(),
            left: vec![0.0; max_block_length].into_boxed_slice(),
            right: vec![0.0; max_block_length].into_boxed_slice(),
            #[cfg(debug_assertions)]
            origin: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> RecordingEventKind {
        self.kind
    }

    #[inline]
    pub fn track(&self) -> TrackId {
        self.track
    }

    #[inline]
    pub fn time(&self) -> CycleTime {
        self.time
    }

    #[inline]
    pub fn global_start_frame(&self) -> u64 {
        self.time.global_start_frame
    }

    #[inline]
    pub fn local_offset(&self) -> u32 {
        self.time.local_offset
    }

    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.time.frame_count
    }

    /// Inline buffer capacity in frames.
    pub fn block_length(&self) -> usize {
        self.left.len()
    }

    /// Recorded samples, `Some` only for [`RecordingEventKind::Audio`].
    #[inline]
    pub fn audio(&self) -> Option<(&[f32], &[f32])> {
        match self.kind {
            RecordingEventKind::Audio => {
                let frames = self.time.frame_count as usize;
                Some((&self.left[..frames], &self.right[..frames]))
            }
            _ => None,
        }
    }

    #[inline]
    pub fn midi(&self) -> Option<&MidiEvent> {
        match &self.kind {
            RecordingEventKind::Midi(midi) => midi.as_ref(),
            _ => None,
        }
    }

    /// Where the event was pushed from (debug builds only).
    #[cfg(debug_assertions)]
    pub fn origin(&self) -> Option<&'static Location<'static>> {
        self.origin
    }

    /// Fill the event in place. Returns `false` (leaving the event unusable)
    /// when the arguments violate the event invariants.
    ///
    /// Runs on the audio thread: no allocation, no locking.
    pub(crate) fn populate(
        &mut self,
        track: TrackId,
        time: CycleTime,
        kind: RecordingEventKind,
        audio: Option<StereoInput<'_>>,
        origin: &'static Location<'static>,
    ) -> bool {
        if time.local_offset as usize + time.frame_count as usize > self.block_length() {
            return false;
        }
        if kind.is_pause() && time.frame_count != 0 {
            return false;
        }

        match (&kind, audio) {
            (RecordingEventKind::Audio, Some(input)) => {
                let frames = time.frame_count as usize;
                let from = time.local_offset as usize;
                let to = from + frames;
                if frames == 0 || input.left.len() < to || input.right.len() < to {
                    return false;
                }
                self.left[..frames].copy_from_slice(&input.left[from..to]);
                self.right[..frames].copy_from_slice(&input.right[from..to]);
            }
            (RecordingEventKind::Audio, None) | (_, Some(_)) => return false,
            (RecordingEventKind::Midi(Some(midi)), None) => {
                if !time.contains_offset(midi.frame_offset) {
                    return false;
                }
            }
            _ => {}
        }

        self.kind = kind;
        self.track = track;
        self.time = time;
        #[cfg(debug_assertions)]
        {
            self.origin = Some(origin);
        }
        #[cfg(not(debug_assertions))]
        let _ = origin;
        true
    }
}

impl std::fmt::Debug for RecordingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingEvent")
            .field("kind", &self.kind)
            .field("track", &self.track)
            .field("time", &self.time)
            .finish()
    }
}
