use crate::config::ClientConfig;
use crate::error::HuddleError;
use crate::native::{
    ConnectivityState, MediaKind, MediaStreamHandle, NativeBackend, NativeConnection, NativeEvent,
    NativeEventSink, SdpKind,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::IceCandidate;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Native transport built on the `webrtc` crate.
pub struct WebRtcBackend {
    api: Arc<API>,
    ice_servers: Vec<RTCIceServer>,
    channel_label: String,
    unreliable: bool,
    local_tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl WebRtcBackend {
    pub fn new(config: &ClientConfig) -> crate::error::Result<Self> {
        // Codecs are registered even for data-only links so remote media can be accepted.
        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(|e| {
            HuddleError::CapabilityMissing(format!("codec registration failed: {}", e))
        })?;
        let registry = register_default_interceptors(Registry::new(), &mut media).map_err(|e| {
            HuddleError::CapabilityMissing(format!("interceptor registration failed: {}", e))
        })?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            api: Arc::new(api),
            ice_servers,
            channel_label: config.channel_label.clone(),
            unreliable: config.unreliable,
            local_tracks: Vec::new(),
        })
    }

    /// Sends `track` to every peer this backend connects to.
    pub fn with_local_track(mut self, track: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        self.local_tracks.push(track);
        self
    }
}

#[async_trait]
impl NativeBackend for WebRtcBackend {
    async fn connect(&self, sink: NativeEventSink) -> Result<Box<dyn NativeConnection>> {
        let rtc_config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };
        let pc = Arc::new(
            self.api
                .new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );
        let channel: Arc<OnceLock<Arc<RTCDataChannel>>> = Arc::new(OnceLock::new());

        // Trickle: every local candidate goes out as soon as it is found.
        let ice_sink = sink.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        sink.emit(NativeEvent::CandidateDiscovered(IceCandidate {
                            candidate: init.candidate,
                            sdp_m_line_index: init.sdp_mline_index,
                            sdp_mid: init.sdp_mid,
                        }));
                    }
                    Err(e) => warn!("Failed to encode local candidate: {}", e),
                }
            })
        }));

        let state_sink = sink.clone();
        pc.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
            let sink = state_sink.clone();
            Box::pin(async move {
                debug!("ICE state with {} is {}", sink.remote(), s);
                sink.emit(NativeEvent::Connectivity(connectivity(s)));
            })
        }));

        // The answering side never creates a channel; it adopts the offerer's.
        let dc_sink = sink.clone();
        let dc_slot = channel.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let sink = dc_sink.clone();
            let slot = dc_slot.clone();
            Box::pin(async move {
                debug!("Data channel '{}' offered by {}", dc.label(), sink.remote());
                wire_data_channel(&dc, &sink);
                if dc.ready_state() == RTCDataChannelState::Open {
                    sink.emit(NativeEvent::ChannelOpen);
                }
                if slot.set(dc).is_err() {
                    warn!("Ignoring second data channel from {}", sink.remote());
                }
            })
        }));

        let track_sink = sink.clone();
        pc.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let sink = track_sink.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                info!("Remote {:?} track from {}", kind, sink.remote());
                let stream_id = track.stream_id().to_string();
                let track_id = track.id().to_string();
                let handle = MediaStreamHandle::new(stream_id, track_id, kind, track);
                sink.emit(NativeEvent::RemoteStream(handle));
            })
        }));

        for track in &self.local_tracks {
            let sender = pc
                .add_track(track.clone())
                .await
                .context("Failed to add local track")?;
            // RTCP has to be drained for the interceptors to work.
            tokio::spawn(async move { while sender.read_rtcp().await.is_ok() {} });
        }

        Ok(Box::new(WebRtcConnection {
            pc,
            channel,
            sink,
            label: self.channel_label.clone(),
            unreliable: self.unreliable,
        }))
    }
}

pub struct WebRtcConnection {
    pc: Arc<RTCPeerConnection>,
    channel: Arc<OnceLock<Arc<RTCDataChannel>>>,
    sink: NativeEventSink,
    label: String,
    unreliable: bool,
}

#[async_trait]
impl NativeConnection for WebRtcConnection {
    async fn create_data_channel(&self) -> Result<()> {
        let init = if self.unreliable {
            RTCDataChannelInit {
                ordered: Some(false),
                max_retransmits: Some(0),
                ..Default::default()
            }
        } else {
            RTCDataChannelInit::default()
        };

        let dc = self
            .pc
            .create_data_channel(&self.label, Some(init))
            .await
            .context("Failed to create data channel")?;
        wire_data_channel(&dc, &self.sink);
        self.channel
            .set(dc)
            .map_err(|_| anyhow!("data channel already exists"))
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.pc.create_offer(None).await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.pc.create_answer(None).await?;
        Ok(answer.sdp)
    }

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        self.pc
            .set_local_description(description(kind, sdp)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        self.pc
            .set_remote_description(description(kind, sdp)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.pc.add_ice_candidate(init).await?;
        Ok(())
    }

    fn is_channel_open(&self) -> bool {
        self.channel
            .get()
            .is_some_and(|dc| dc.ready_state() == RTCDataChannelState::Open)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let dc = self
            .channel
            .get()
            .ok_or_else(|| anyhow!("no data channel"))?;
        dc.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}

fn description(kind: SdpKind, sdp: String) -> Result<RTCSessionDescription> {
    let desc = match kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
    };
    Ok(desc)
}

fn connectivity(state: RTCIceConnectionState) -> ConnectivityState {
    match state {
        RTCIceConnectionState::Checking => ConnectivityState::Checking,
        RTCIceConnectionState::Connected => ConnectivityState::Connected,
        RTCIceConnectionState::Completed => ConnectivityState::Completed,
        RTCIceConnectionState::Disconnected => ConnectivityState::Disconnected,
        RTCIceConnectionState::Failed => ConnectivityState::Failed,
        RTCIceConnectionState::Closed => ConnectivityState::Closed,
        _ => ConnectivityState::New,
    }
}

fn wire_data_channel(dc: &Arc<RTCDataChannel>, sink: &NativeEventSink) {
    let open_sink = sink.clone();
    dc.on_open(Box::new(move || {
        let sink = open_sink.clone();
        Box::pin(async move {
            sink.emit(NativeEvent::ChannelOpen);
        })
    }));

    let close_sink = sink.clone();
    dc.on_close(Box::new(move || {
        let sink = close_sink.clone();
        Box::pin(async move {
            sink.emit(NativeEvent::ChannelClose);
        })
    }));

    let error_sink = sink.clone();
    dc.on_error(Box::new(move |err: webrtc::Error| {
        let sink = error_sink.clone();
        Box::pin(async move {
            sink.emit(NativeEvent::ChannelError(err.to_string()));
        })
    }));

    let message_sink = sink.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let sink = message_sink.clone();
        Box::pin(async move {
            sink.emit(NativeEvent::ChannelMessage(Bytes::from(msg.data.to_vec())));
        })
    }));
}
