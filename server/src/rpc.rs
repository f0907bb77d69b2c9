//! Message-level entry points: a `greeter` request message in, a response
//! message out. Shared by the Connect handler and the tonic service so both
//! map messages onto [`ToDoService`] the same way.

use todo_proto::{
    CreateRequest, CreateResponse, DeleteRequest, GetAllResponse, GetOneRequest, GetOneResponse,
    UpdateRequest, UpdateResponse, UpdateStatusRequest,
};

use crate::context::CallContext;
use crate::error::ServiceError;
use crate::model::{parse_status, NewToDo};
use crate::service::ToDoService;

pub async fn get_all(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    _req: (),
) -> Result<GetAllResponse, ServiceError> {
    let items = svc.get_all(ctx).await?;
    Ok(GetAllResponse {
        items: items.into_iter().map(Into::into).collect(),
    })
}

pub async fn get_one(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    req: GetOneRequest,
) -> Result<GetOneResponse, ServiceError> {
    let item = svc.get_one(ctx, req.id).await?;
    Ok(GetOneResponse {
        item: Some(item.into()),
    })
}

pub async fn create(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    req: CreateRequest,
) -> Result<CreateResponse, ServiceError> {
    let input = NewToDo::try_from(req.item)?;
    let item = svc.create(ctx, input).await?;
    Ok(CreateResponse {
        item: Some(item.into()),
    })
}

pub async fn update(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    req: UpdateRequest,
) -> Result<UpdateResponse, ServiceError> {
    let input = NewToDo::try_from(req.item)?;
    let item = svc.update(ctx, req.id, input).await?;
    Ok(UpdateResponse {
        item: Some(item.into()),
    })
}

pub async fn update_status(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    req: UpdateStatusRequest,
) -> Result<(), ServiceError> {
    let status = parse_status(req.status)?;
    svc.update_status(ctx, req.id, status).await
}

pub async fn delete(
    svc: &dyn ToDoService,
    ctx: &CallContext,
    req: DeleteRequest,
) -> Result<(), ServiceError> {
    svc.delete(ctx, req.id).await
}
