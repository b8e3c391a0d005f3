use crate::{error::SoundError, sample::Sample, sound::Sound, sound::channel::Channel};

/// One channel's worth of plottable points: sample instants paired with
/// raw sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Produces per-channel time series for an external charting frontend.
/// The core renders nothing itself and consumes nothing back.
pub trait Plottable {
    fn channel_series(&mut self) -> Result<Vec<ChannelSeries>, SoundError>;
}

impl Plottable for Channel {
    fn channel_series(&mut self) -> Result<Vec<ChannelSeries>, SoundError> {
        let values: Vec<f64> = self.data()?.iter().map(|s| Sample::to_f64(*s)).collect();
        // materialization may have fixed the frame count, so take the
        // instants after reading the data
        let times: Vec<f64> = self.time_sequence().take(values.len()).collect();
        Ok(vec![ChannelSeries { times, values }])
    }
}

impl Plottable for Sound {
    fn channel_series(&mut self) -> Result<Vec<ChannelSeries>, SoundError> {
        let mut series = Vec::with_capacity(self.n_channels());
        for channel in self.channels_mut() {
            series.extend(channel.channel_series()?);
        }
        Ok(series)
    }
}
