//! Adapter for replayers compiled from C.
//!
//! The replayer exports a small set of functions over one global tune
//! (the hively/format-synth wrapper shape). The caller resolves them and
//! hands them over as a [`NativeApi`] table.

use crate::error::ModuleError;
use crate::module::ReplayModule;
use crate::protocol::ModulePosition;

/// Function table of a native replayer.
///
/// All functions act on the replayer's single loaded tune and must only
/// be called from one thread at a time. `decode_frame` writes
/// `frame_samples()` floats to each pointer.
#[derive(Clone, Copy, Debug)]
pub struct NativeApi {
    pub init: unsafe extern "C" fn(sample_rate: u32),
    /// Returns non-zero on success
    pub load_tune: unsafe extern "C" fn(data: *const u8, len: u32, stereo_mode: i32) -> i32,
    pub free_tune: unsafe extern "C" fn(),
    /// Returns non-zero on success
    pub init_subsong: unsafe extern "C" fn(index: u32) -> i32,
    /// Returns samples written
    pub decode_frame: unsafe extern "C" fn(left: *mut f32, right: *mut f32) -> u32,
    pub frame_samples: unsafe extern "C" fn() -> u32,
    pub is_song_end: unsafe extern "C" fn() -> i32,
    pub get_position: unsafe extern "C" fn() -> i32,
    pub get_row: unsafe extern "C" fn() -> i32,
    pub get_speed: unsafe extern "C" fn() -> i32,
}

/// A native replayer behind [`ReplayModule`].
pub struct NativeModule {
    api: NativeApi,
    stereo_mode: i32,
    loaded: bool,
}

impl NativeModule {
    pub fn new(api: NativeApi) -> Self {
        Self {
            api,
            stereo_mode: 2,
            loaded: false,
        }
    }

    /// Stereo mode handed to `load_tune` (replayer specific, hively uses 0-4).
    pub fn with_stereo_mode(mut self, mode: i32) -> Self {
        self.stereo_mode = mode;
        self
    }
}

impl ReplayModule for NativeModule {
    fn init(&mut self, sample_rate: u32) -> Result<(), ModuleError> {
        if sample_rate == 0 {
            return Err(ModuleError::Init("sample rate must be non-zero".into()));
        }
        // SAFETY: plain value argument
        unsafe { (self.api.init)(sample_rate) };
        Ok(())
    }

    fn load(&mut self, binary: &[u8]) -> Result<(), ModuleError> {
        self.unload();
        let len = u32::try_from(binary.len()).map_err(|_| ModuleError::Load("module too large".into()))?;
        // SAFETY: the pointer is valid for `len` bytes; the replayer copies what it keeps
        let ok = unsafe { (self.api.load_tune)(binary.as_ptr(), len, self.stereo_mode) };
        if ok == 0 {
            return Err(ModuleError::Load("replayer could not parse the tune".into()));
        }
        self.loaded = true;
        Ok(())
    }

    fn seek_subsong(&mut self, index: u32) -> Result<(), ModuleError> {
        if !self.loaded {
            return Err(ModuleError::NotLoaded);
        }
        // SAFETY: a tune is loaded
        match unsafe { (self.api.init_subsong)(index) } {
            0 => Err(ModuleError::NoSuchSubsong(index)),
            _ => Ok(()),
        }
    }

    fn frame_len(&self) -> usize {
        // SAFETY: no arguments; valid after init
        unsafe { (self.api.frame_samples)() as usize }
    }

    fn decode_frame(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<usize, ModuleError> {
        if !self.loaded {
            return Err(ModuleError::NotLoaded);
        }
        let needed = self.frame_len();
        if left.len() < needed || right.len() < needed {
            return Err(ModuleError::Decode(format!(
                "buffers hold {} samples, replayer writes {needed}",
                left.len().min(right.len())
            )));
        }
        // SAFETY: both buffers hold at least frame_samples() floats
        let written = unsafe { (self.api.decode_frame)(left.as_mut_ptr(), right.as_mut_ptr()) };
        Ok((written as usize).min(needed))
    }

    fn is_song_end(&self) -> bool {
        // SAFETY: no arguments
        self.loaded && unsafe { (self.api.is_song_end)() } != 0
    }

    fn position(&self) -> Option<ModulePosition> {
        if !self.loaded {
            return None;
        }
        // SAFETY: getters take no arguments
        let (order, row, speed) = unsafe {
            (
                (self.api.get_position)(),
                (self.api.get_row)(),
                (self.api.get_speed)(),
            )
        };
        Some(ModulePosition {
            order: order.clamp(0, u16::MAX as i32) as u16,
            row: row.clamp(0, u16::MAX as i32) as u16,
            speed: speed.clamp(0, u16::MAX as i32) as u16,
        })
    }

    fn unload(&mut self) {
        if self.loaded {
            // SAFETY: a tune is loaded
            unsafe { (self.api.free_tune)() };
            self.loaded = false;
        }
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! A replayer written in Rust that exports the C shape. State is per
    //! thread so parallel tests do not share a tune.

    use std::cell::RefCell;

    use super::NativeApi;

    #[derive(Default)]
    pub struct FakeTune {
        pub sample_rate: u32,
        pub loaded: bool,
        pub frames_left: u32,
        pub position: i32,
        pub subsong: u32,
        pub freed: u32,
    }

    thread_local! {
        pub static TUNE: RefCell<FakeTune> = RefCell::new(FakeTune::default());
    }

    /// Tunes start with the magic byte `H`; the second byte is their length in frames.
    unsafe extern "C" fn init(sample_rate: u32) {
        TUNE.with(|t| t.borrow_mut().sample_rate = sample_rate);
    }

    unsafe extern "C" fn load_tune(data: *const u8, len: u32, _stereo_mode: i32) -> i32 {
        if len < 2 || *data != b'H' {
            return 0;
        }
        let frames = *data.add(1) as u32;
        TUNE.with(|t| {
            let mut t = t.borrow_mut();
            t.loaded = true;
            t.frames_left = frames;
            t.position = 0;
        });
        1
    }

    unsafe extern "C" fn free_tune() {
        TUNE.with(|t| {
            let mut t = t.borrow_mut();
            t.loaded = false;
            t.freed += 1;
        });
    }

    unsafe extern "C" fn init_subsong(index: u32) -> i32 {
        if index > 1 {
            return 0;
        }
        TUNE.with(|t| {
            let mut t = t.borrow_mut();
            t.subsong = index;
            t.position = 0;
        });
        1
    }

    unsafe extern "C" fn frame_samples() -> u32 {
        TUNE.with(|t| t.borrow().sample_rate / 50)
    }

    unsafe extern "C" fn decode_frame(left: *mut f32, right: *mut f32) -> u32 {
        let n = frame_samples();
        for i in 0..n as usize {
            *left.add(i) = 0.5;
            *right.add(i) = -0.5;
        }
        TUNE.with(|t| {
            let mut t = t.borrow_mut();
            t.frames_left = t.frames_left.saturating_sub(1);
            t.position += 1;
        });
        n
    }

    unsafe extern "C" fn is_song_end() -> i32 {
        TUNE.with(|t| (t.borrow().frames_left == 0) as i32)
    }

    unsafe extern "C" fn get_position() -> i32 {
        TUNE.with(|t| t.borrow().position)
    }

    unsafe extern "C" fn get_row() -> i32 {
        TUNE.with(|t| t.borrow().position % 64)
    }

    unsafe extern "C" fn get_speed() -> i32 {
        6
    }

    pub fn api() -> NativeApi {
        NativeApi {
            init,
            load_tune,
            free_tune,
            init_subsong,
            decode_frame,
            frame_samples,
            is_song_end,
            get_position,
            get_row,
            get_speed,
        }
    }
}
