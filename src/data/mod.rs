mod backtest_api;
mod push_channel;
mod transport;

pub use backtest_api::{
    BacktestApi, JobStatusSource, JobSubmitter, StatusError, SubmitError, classify_status,
};
pub use push_channel::{ConnectionSnapshot, PushChannelClient};
pub use transport::{ChannelTransport, PeerLink, SocketLink, WsTransport};
