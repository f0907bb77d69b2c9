//! gRPC and gRPC-Web through tonic.
//!
//! # Design
//! [`GrpcAdapter`] implements the tonic-generated `ToDoService` trait on top
//! of [`crate::service::ToDoService`], so gRPC framing, trailers and status
//! encoding come from tonic. [`GrpcFront`] holds the assembled [`Routes`]
//! (plus the reflection services on the `grpc` binding) and is mounted as an
//! axum middleware: gRPC-family requests are handed to tonic, everything else
//! continues to the Connect routes. gRPC-Web goes through `tonic-web`'s
//! translation layer first.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{self, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::BoxError;
use bytes::Bytes;
use todo_proto::greeter::to_do_service_server::{ToDoService as ToDoRpc, ToDoServiceServer};
use todo_proto::{
    CreateRequest, CreateResponse, DeleteRequest, GetAllResponse, GetOneRequest, GetOneResponse,
    Method, UpdateRequest, UpdateResponse, UpdateStatusRequest,
};
use tonic::service::Routes;
use tonic::Status;
use tonic_web::GrpcWebLayer;
use tower::{Layer, ServiceExt};
use tracing::{debug, warn};

use crate::binding::{AppState, Binding};
use crate::context::CallContext;
use crate::error::{ServerError, ServiceError};
use crate::rpc;
use crate::service::ToDoService;
use crate::wire::{self, Wire, MAX_BODY_SIZE, MAX_MESSAGE_SIZE};

/// The tonic service: admits a call per binding, builds its
/// [`CallContext`] and runs it through [`rpc`].
pub struct GrpcAdapter {
    service: Arc<dyn ToDoService>,
    binding: Binding,
    call_timeout: Option<Duration>,
}

impl GrpcAdapter {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.service.clone(),
            binding: state.binding,
            call_timeout: state.call_timeout,
        }
    }

    fn admit<T>(&self, method: Method, request: &tonic::Request<T>) -> Result<CallContext, Status> {
        if !self.binding.exposes(method) {
            return Err(Status::unimplemented(format!(
                "{} is not implemented",
                method.path().trim_start_matches('/')
            )));
        }
        let headers = request.metadata().clone().into_headers();
        Ok(CallContext::from_headers(&headers, Wire::Grpc, self.call_timeout))
    }
}

fn reply<T>(method: Method, result: Result<T, ServiceError>) -> Result<tonic::Response<T>, Status> {
    result.map(tonic::Response::new).map_err(|err| {
        let status = Status::from(err);
        debug!(method = method.name(), code = ?status.code(), message = status.message(), "call failed");
        status
    })
}

#[tonic::async_trait]
impl ToDoRpc for GrpcAdapter {
    async fn get_all(
        &self,
        request: tonic::Request<()>,
    ) -> Result<tonic::Response<GetAllResponse>, Status> {
        let ctx = self.admit(Method::GetAll, &request)?;
        let result = rpc::get_all(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::GetAll, result)
    }

    async fn get_one(
        &self,
        request: tonic::Request<GetOneRequest>,
    ) -> Result<tonic::Response<GetOneResponse>, Status> {
        let ctx = self.admit(Method::GetOne, &request)?;
        let result = rpc::get_one(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::GetOne, result)
    }

    async fn create(
        &self,
        request: tonic::Request<CreateRequest>,
    ) -> Result<tonic::Response<CreateResponse>, Status> {
        let ctx = self.admit(Method::Create, &request)?;
        let result = rpc::create(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::Create, result)
    }

    async fn update(
        &self,
        request: tonic::Request<UpdateRequest>,
    ) -> Result<tonic::Response<UpdateResponse>, Status> {
        let ctx = self.admit(Method::Update, &request)?;
        let result = rpc::update(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::Update, result)
    }

    async fn update_status(
        &self,
        request: tonic::Request<UpdateStatusRequest>,
    ) -> Result<tonic::Response<()>, Status> {
        let ctx = self.admit(Method::UpdateStatus, &request)?;
        let result = rpc::update_status(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::UpdateStatus, result)
    }

    async fn delete(
        &self,
        request: tonic::Request<DeleteRequest>,
    ) -> Result<tonic::Response<()>, Status> {
        let ctx = self.admit(Method::Delete, &request)?;
        let result = rpc::delete(self.service.as_ref(), &ctx, request.into_inner()).await;
        reply(Method::Delete, result)
    }
}

/// tonic's half of the router.
#[derive(Clone)]
pub struct GrpcFront {
    routes: Routes,
    binding: Binding,
}

impl GrpcFront {
    pub fn new(state: &AppState) -> Result<Self, ServerError> {
        let todo = ToDoServiceServer::new(GrpcAdapter::new(state))
            .max_decoding_message_size(MAX_MESSAGE_SIZE);
        let mut routes = Routes::new(todo);
        if state.binding.serves_reflection() {
            let reflection = || {
                tonic_reflection::server::Builder::configure()
                    .register_encoded_file_descriptor_set(todo_proto::FILE_DESCRIPTOR_SET)
            };
            routes = routes
                .add_service(reflection().build_v1()?)
                .add_service(reflection().build_v1alpha()?);
        }
        Ok(Self {
            routes,
            binding: state.binding,
        })
    }

    async fn forward(self, wire: Wire, request: Request) -> Response {
        match wire {
            Wire::GrpcWeb { text } => {
                let request = if text {
                    match join_text_chunks(request).await {
                        Ok(request) => request,
                        Err(status) => return grpc_web_status(status),
                    }
                } else {
                    request
                };
                let web = GrpcWebLayer::new().layer(self.routes);
                into_response(web.oneshot(request.map(tonic::body::Body::new)).await)
            }
            _ => into_response(self.routes.oneshot(request.map(tonic::body::Body::new)).await),
        }
    }
}

/// Hands gRPC-family requests to tonic; Connect and unknown content types
/// continue down the axum router.
pub async fn route_grpc(State(front): State<GrpcFront>, request: Request, next: Next) -> Response {
    match Wire::from_headers(request.headers()) {
        Some(wire) if wire.is_grpc_family() => {
            if !front.binding.accepts(wire) {
                return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
            }
            front.forward(wire, request).await
        }
        _ => next.run(request).await,
    }
}

async fn join_text_chunks(request: Request) -> Result<Request, Status> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|e| Status::resource_exhausted(format!("request body: {e}")))?;
    let joined = wire::join_base64_chunks(bytes)
        .map_err(|e| Status::invalid_argument(format!("invalid base64 body: {e}")))?;
    Ok(Request::from_parts(parts, Body::from(joined)))
}

/// A trailers-only gRPC-Web answer for failures before tonic sees the call.
fn grpc_web_status(status: Status) -> Response {
    let mut response: Response = status.into_http();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/grpc-web-text+proto"),
    );
    response
}

fn into_response<B, E>(result: Result<http::Response<B>, E>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    E: Into<BoxError>,
{
    match result {
        Ok(response) => response.map(Body::new),
        Err(err) => {
            let err: BoxError = err.into();
            warn!(error = %err, "grpc service failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
