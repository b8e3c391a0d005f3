use std::f64::consts::PI;

use waveframe::{
    Playable as _,
    sample::{Frame, Sample},
    sound::Sound,
};

fn main() {
    let (fps, frequency, volume) = (44100u32, 110.0, 0.5);
    let amplitude = f64::from(i16::MAX) * volume;

    let mut sound = Sound::from_datatimes(
        move |t| {
            let value = (amplitude * (frequency * 2.0 * PI * t).sin()).round() as i16;
            Ok(Frame::Mono(Sample::I16(value)))
        },
        fps,
    )
    .expect("Failed to build sine sound")
    .with_duration(3.0);

    let duration = sound.duration();
    println!("Playing a {frequency} Hz sine for {duration} seconds.");

    match sound.play(Some(duration)) {
        Ok(_player) => println!("Playback finished."),
        Err(e) => eprintln!("Failed to start playback: {e}"),
    }
}
