//! `/courses` routes: create, list, inspect, regenerate, cancel, delete and
//! export course trees.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, RawQuery,
    },
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::common::{CourseId, JobId};
use crate::domains::courses::activities::{
    course_to_markdown, course_to_zip, export_base_name, load_course_tree,
};
use crate::domains::courses::data::{
    CourseCreate, CourseListItem, CourseOut, CourseStatusOut, ExportFormat, ExportParams,
    ListCoursesParams, RegenerateParams,
};
use crate::domains::courses::jobs::GenerateCourseJob;
use crate::domains::courses::models::{Course, CourseModule};
use crate::kernel::ServerDeps;
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

const COURSE_NOT_FOUND: &str = "Course not found";
const JOB_NOT_FOUND: &str = "Course with given job_id not found";
const CANCELED_BY_USER: &str = "canceled by user";

async fn find_course(state: &AppState, id: CourseId) -> ApiResult<Course> {
    Course::find_by_id(id, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))
}

/// Job ids that are not UUIDs can't name any course.
async fn find_course_by_job(state: &AppState, raw_job_id: &str) -> ApiResult<Course> {
    let Ok(job_id) = raw_job_id.parse::<JobId>() else {
        return Err(ApiError::not_found(JOB_NOT_FOUND));
    };
    Course::find_by_job_id(job_id, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found(JOB_NOT_FOUND))
}

/// Point the course at a fresh job id, then enqueue the job under that id.
///
/// The course row names the job before a worker can claim it, so the worker
/// never sees a course that belongs to someone else.
async fn start_generation(deps: &ServerDeps, course: &Course, clear: bool) -> ApiResult<Course> {
    let job_id = JobId::new();

    let mut tx = deps.db_pool.begin().await?;
    if clear {
        let removed = CourseModule::delete_by_course(course.id, &mut *tx).await?;
        info!(course_id = %course.id, modules = removed, "cleared course modules");
    }
    let course = Course::requeue(course.id, job_id, clear, &mut *tx).await?;
    tx.commit().await?;

    let job = GenerateCourseJob::new(course.id, &course.title);
    if let Err(e) = deps.job_queue.enqueue_command_as(job_id, &job).await {
        let message = format!("failed to enqueue generation: {e:#}");
        if let Err(mark_err) = Course::mark_failed(course.id, job_id, &message, &deps.db_pool).await
        {
            warn!(course_id = %course.id, error = %mark_err, "failed to record enqueue failure");
        }
        return Err(e.into());
    }

    info!(course_id = %course.id, job_id = %job_id, "course generation enqueued");
    Ok(course)
}

/// Best-effort revoke: drop the job if still pending and abort it if it is
/// running in this process. Workers elsewhere stop at their next check.
async fn revoke_job(deps: &ServerDeps, job_id: JobId) {
    match deps.job_queue.cancel(job_id).await {
        Ok(true) => info!(job_id = %job_id, "pending job cancelled"),
        Ok(false) => {}
        Err(e) => warn!(job_id = %job_id, error = %e, "failed to cancel pending job"),
    }
    if deps.job_cancellations.cancel(job_id) {
        info!(job_id = %job_id, "running job aborted");
    }
}

async fn cancel_course(state: &AppState, course: Course) -> ApiResult<CourseStatusOut> {
    if let Some(job_id) = course.job_id {
        revoke_job(&state.deps, job_id).await;
    }
    let course = Course::mark_canceled(course.id, CANCELED_BY_USER, &state.db_pool).await?;
    info!(course_id = %course.id, "course generation canceled by user");
    Ok(course.into())
}

async fn delete_course_row(state: &AppState, course: Course) -> ApiResult<StatusCode> {
    if course.status.is_in_progress() {
        // Mark first so a worker in another process aborts at its next check.
        Course::mark_canceled(course.id, CANCELED_BY_USER, &state.db_pool).await?;
        if let Some(job_id) = course.job_id {
            revoke_job(&state.deps, job_id).await;
        }
    }
    Course::delete(course.id, &state.db_pool).await?;
    info!(course_id = %course.id, "course deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /courses
pub async fn create_course(
    Extension(state): Extension<AppState>,
    payload: Result<Json<CourseCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CourseOut>)> {
    let Json(payload) = payload?;
    let new_course = payload.validate().map_err(ApiError::Unprocessable)?;

    let course = Course::create(&new_course.title, &new_course.description, &state.db_pool).await?;
    info!(course_id = %course.id, title = %course.title, "course created");

    let course = start_generation(&state.deps, &course, false).await?;
    let tree = load_course_tree(course.id, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;

    Ok((StatusCode::CREATED, Json(tree.into())))
}

/// GET /courses
pub async fn list_courses(
    Extension(state): Extension<AppState>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let params = ListCoursesParams::parse(query.as_deref()).map_err(ApiError::Unprocessable)?;
    let page = params.page.validate()?;

    let total = Course::count(&params.filter, &state.db_pool).await?;
    let items: Vec<CourseListItem> = Course::list(&params.filter, page, &state.db_pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let headers = [
        ("x-total-count", total.to_string()),
        ("x-limit", page.limit.to_string()),
        ("x-offset", page.offset.to_string()),
    ];
    Ok((headers, Json(items)).into_response())
}

/// GET /courses/:id
pub async fn get_course(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
) -> ApiResult<Json<CourseOut>> {
    let Path(id) = path?;
    let tree = load_course_tree(id, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;
    Ok(Json(tree.into()))
}

/// GET /courses/:id/status
pub async fn get_course_status(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
) -> ApiResult<Json<CourseStatusOut>> {
    let Path(id) = path?;
    Ok(Json(find_course(&state, id).await?.into()))
}

/// POST /courses/:id/regenerate
pub async fn regenerate_course(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
    params: Result<Query<RegenerateParams>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<CourseStatusOut>)> {
    let Path(id) = path?;
    let Query(params) = params?;
    let course = find_course(&state, id).await?;

    let in_progress = course.status.is_in_progress();
    if in_progress && !params.force {
        return Err(ApiError::Conflict(json!({
            "message": "Generation already in progress",
            "status": course.status,
            "job_id": course.job_id,
        })));
    }

    if in_progress {
        if let Some(job_id) = course.job_id {
            revoke_job(&state.deps, job_id).await;
        }
    }

    let course = start_generation(&state.deps, &course, params.clear).await?;
    Ok((StatusCode::ACCEPTED, Json(course.into())))
}

/// GET /courses/by-job/:job_id
pub async fn get_course_by_job(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CourseStatusOut>> {
    Ok(Json(find_course_by_job(&state, &job_id).await?.into()))
}

/// POST /courses/:id/cancel
pub async fn cancel_course_job(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
) -> ApiResult<Json<CourseStatusOut>> {
    let Path(id) = path?;
    let course = find_course(&state, id).await?;
    Ok(Json(cancel_course(&state, course).await?))
}

/// POST /courses/by-job/:job_id/cancel
pub async fn cancel_by_job(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CourseStatusOut>> {
    let course = find_course_by_job(&state, &job_id).await?;
    Ok(Json(cancel_course(&state, course).await?))
}

/// DELETE /courses/:id
pub async fn delete_course(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let course = find_course(&state, id).await?;
    delete_course_row(&state, course).await
}

/// DELETE /courses/by-job/:job_id
pub async fn delete_course_by_job(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    let course = find_course_by_job(&state, &job_id).await?;
    delete_course_row(&state, course).await
}

fn attachment(base: &str, extension: &str) -> ApiResult<HeaderValue> {
    let base: String = base
        .chars()
        .filter(|c| !matches!(c, '"' | '\\') && !c.is_control())
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{base}.{extension}\""))
        .map_err(|_| ApiError::Unprocessable("filename contains unsupported characters".to_string()))
}

/// GET /courses/:id/export
pub async fn export_course(
    Extension(state): Extension<AppState>,
    path: Result<Path<CourseId>, PathRejection>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Query(params) = params?;
    let tree = load_course_tree(id, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;

    let base = export_base_name(&tree, params.filename.as_deref());

    let response = match params.fmt {
        ExportFormat::Md => (
            [
                (CONTENT_TYPE, HeaderValue::from_static("text/markdown; charset=utf-8")),
                (CONTENT_DISPOSITION, attachment(&base, "md")?),
            ],
            course_to_markdown(&tree),
        )
            .into_response(),
        ExportFormat::Zip => (
            [
                (CONTENT_TYPE, HeaderValue::from_static("application/zip")),
                (CONTENT_DISPOSITION, attachment(&base, "zip")?),
            ],
            course_to_zip(&tree)?,
        )
            .into_response(),
    };

    Ok(response)
}
