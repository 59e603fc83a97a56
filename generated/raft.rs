#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRaftMessage {
    #[prost(string, tag = "1")]
    pub from_member_id: ::prost::alloc::string::String,
    #[prost(oneof = "proto_raft_message::Message", tags = "2, 3, 4")]
    pub message: ::core::option::Option<proto_raft_message::Message>,
}
/// Nested message and enum types in `ProtoRaftMessage`.
pub mod proto_raft_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "2")]
        AppendEntriesRequest(super::ProtoAppendEntriesReq),
        #[prost(message, tag = "3")]
        AppendEntriesResponse(super::ProtoAppendEntriesResp),
        #[prost(message, tag = "4")]
        LogCompactionInfo(super::ProtoLogCompactionInfo),
    }
}
/// Empty
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDeliverAck {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoLogEntry {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub command: ::prost::alloc::vec::Vec<u8>,
}
/// Index 0 means "no entry" for every index field below.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAppendEntriesReq {
    #[prost(uint64, tag = "1")]
    pub leader_term: u64,
    #[prost(uint64, tag = "2")]
    pub previous_log_entry_index: u64,
    #[prost(uint64, tag = "3")]
    pub previous_log_entry_term: u64,
    #[prost(message, repeated, tag = "4")]
    pub entries: ::prost::alloc::vec::Vec<ProtoLogEntry>,
    #[prost(uint64, tag = "5")]
    pub leader_commit_index: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAppendEntriesResp {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(bool, tag = "2")]
    pub success: bool,
    #[prost(uint64, tag = "3")]
    pub match_index: u64,
    #[prost(uint64, tag = "4")]
    pub append_index: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoLogCompactionInfo {
    #[prost(uint64, tag = "1")]
    pub leader_term: u64,
    #[prost(uint64, tag = "2")]
    pub pruned_index: u64,
}
#[doc = r" Generated client implementations."]
pub mod grpc_raft_transport_client {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = " One-way delivery of raft messages between cluster members. Responses to an AppendEntries"]
    #[doc = " request travel back as their own `Deliver` call from the follower."]
    pub struct GrpcRaftTransportClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl GrpcRaftTransportClient<tonic::transport::Channel> {
        #[doc = r" Attempt to create a new client by connecting to a given endpoint."]
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: std::convert::TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> GrpcRaftTransportClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + HttpBody + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as HttpBody>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = tonic::client::Grpc::with_interceptor(inner, interceptor);
            Self { inner }
        }
        pub async fn deliver(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoRaftMessage>,
        ) -> Result<tonic::Response<super::ProtoDeliverAck>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaftTransport/Deliver");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
    impl<T: Clone> Clone for GrpcRaftTransportClient<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }
    impl<T> std::fmt::Debug for GrpcRaftTransportClient<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GrpcRaftTransportClient {{ ... }}")
        }
    }
}
#[doc = r" Generated server implementations."]
pub mod grpc_raft_transport_server {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with GrpcRaftTransportServer."]
    #[async_trait]
    pub trait GrpcRaftTransport: Send + Sync + 'static {
        async fn deliver(
            &self,
            request: tonic::Request<super::ProtoRaftMessage>,
        ) -> Result<tonic::Response<super::ProtoDeliverAck>, tonic::Status>;
    }
    #[doc = " One-way delivery of raft messages between cluster members. Responses to an AppendEntries"]
    #[doc = " request travel back as their own `Deliver` call from the follower."]
    #[derive(Debug)]
    pub struct GrpcRaftTransportServer<T: GrpcRaftTransport> {
        inner: _Inner<T>,
    }
    struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
    impl<T: GrpcRaftTransport> GrpcRaftTransportServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, None);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, Some(interceptor.into()));
            Self { inner }
        }
    }
    impl<T, B> Service<http::Request<B>> for GrpcRaftTransportServer<T>
    where
        T: GrpcRaftTransport,
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/raft.GrpcRaftTransport/Deliver" => {
                    #[allow(non_camel_case_types)]
                    struct DeliverSvc<T: GrpcRaftTransport>(pub Arc<T>);
                    impl<T: GrpcRaftTransport> tonic::server::UnaryService<super::ProtoRaftMessage> for DeliverSvc<T> {
                        type Response = super::ProtoDeliverAck;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoRaftMessage>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).deliver(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = DeliverSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::BoxBody::empty())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: GrpcRaftTransport> Clone for GrpcRaftTransportServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self { inner }
        }
    }
    impl<T: GrpcRaftTransport> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone(), self.1.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: GrpcRaftTransport> tonic::transport::NamedService for GrpcRaftTransportServer<T> {
        const NAME: &'static str = "raft.GrpcRaftTransport";
    }
}
