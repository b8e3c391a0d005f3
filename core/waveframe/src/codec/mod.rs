//! Container codec boundary. The WAV format itself is delegated to hound;
//! this module only adapts its handles to the frame model.

pub mod wav;
