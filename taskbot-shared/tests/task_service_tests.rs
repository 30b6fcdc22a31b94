/// Integration tests for task operations
///
/// Run against the in-memory store, so no database is needed:
/// cargo test -p taskbot-shared --test task_service_tests

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use taskbot_shared::auth::AuthzError;
use taskbot_shared::commands::{
    parse_all_tasks, parse_comment, parse_create_task, parse_settings, parse_update_status,
    ParseError, SetRoleArgs, AllowUserArgs, UpdateStatusArgs,
};
use taskbot_shared::models::history::HistoryChange;
use taskbot_shared::models::settings::NotificationSetting;
use taskbot_shared::models::task::{TaskPriority, TaskStatus};
use taskbot_shared::models::user::{NewUser, Role, User};
use taskbot_shared::store::{MemoryStore, Store};
use taskbot_shared::tasks::{TaskOpError, TaskService, HISTORY_LIMIT};

struct Fixture {
    store: MemoryStore,
    service: TaskService,
    admin: User,
    employee: User,
    other: User,
}

async fn register(store: &MemoryStore, external_id: &str, handle: &str, role: Role) -> User {
    store
        .register_user(NewUser {
            external_id: external_id.to_string(),
            first_name: None,
            last_name: None,
            handle: Some(handle.to_string()),
            role,
        })
        .await
        .unwrap()
}

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let admin = register(&store, "100", "boss", Role::Admin).await;
    let employee = register(&store, "111", "anna", Role::Employee).await;
    let other = register(&store, "222", "oleg", Role::Employee).await;
    let service = TaskService::new(Arc::new(store.clone()));

    Fixture {
        store,
        service,
        admin,
        employee,
        other,
    }
}

#[tokio::test]
async fn test_create_task_scenario() {
    let f = fixture().await;
    let args = parse_create_task(
        r#"title:"Report" priority:high due_date:2025-12-25 assigned_to:111"#,
        Utc::now(),
    )
    .unwrap();

    let created = f.service.create_task(&f.admin, args).await.unwrap();

    assert_eq!(created.task.title, "Report");
    assert_eq!(created.task.priority, TaskPriority::High);
    assert_eq!(created.task.status, TaskStatus::Pending);
    assert_eq!(created.task.assignee_id, f.employee.id);
    assert_eq!(created.task.creator_id, f.admin.id);
    assert_eq!(
        created.task.due_date,
        Utc.with_ymd_and_hms(2025, 12, 25, 23, 59, 59).unwrap()
    );
    assert_eq!(created.assignee.id, f.employee.id);
}

#[tokio::test]
async fn test_create_task_defaults_to_creator() {
    let f = fixture().await;
    let args = parse_create_task("title:Inventory", Utc::now()).unwrap();

    let created = f.service.create_task(&f.admin, args).await.unwrap();
    assert_eq!(created.task.assignee_id, f.admin.id);
    assert_eq!(created.task.priority, TaskPriority::Medium);
    assert_eq!(created.task.description, "");
}

#[tokio::test]
async fn test_non_numeric_assignee_inserts_nothing() {
    let f = fixture().await;
    for assignee in ["anna", "@anna", "11a", "1.5"] {
        let args = parse_create_task(&format!("title:x assigned_to:{}", assignee), Utc::now()).unwrap();
        let err = f.service.create_task(&f.admin, args).await.unwrap_err();
        assert!(
            matches!(err, TaskOpError::Validation(ParseError::InvalidAssignee(_))),
            "{}: {:?}",
            assignee,
            err
        );
    }
    assert_eq!(f.store.task_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_assignee_inserts_nothing() {
    let f = fixture().await;
    let args = parse_create_task("title:x assigned_to:999", Utc::now()).unwrap();

    let err = f.service.create_task(&f.admin, args).await.unwrap_err();
    assert!(matches!(err, TaskOpError::AssigneeNotFound(ref id) if id == "999"));
    assert_eq!(f.store.task_count().unwrap(), 0);
}

#[tokio::test]
async fn test_employee_cannot_run_admin_operations() {
    let f = fixture().await;

    let args = parse_create_task("title:x", Utc::now()).unwrap();
    let err = f.service.create_task(&f.employee, args).await.unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(AuthzError::AdminRequired)));

    let err = f
        .service
        .list_all_tasks(&f.employee, &parse_all_tasks("").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(_)));

    let err = f
        .service
        .change_role(
            &f.employee,
            SetRoleArgs {
                external_id: "111".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(_)));

    assert_eq!(f.store.task_count().unwrap(), 0);
    let unchanged = f.store.find_user(f.employee.id).await.unwrap().unwrap();
    assert_eq!(unchanged.role, Role::Employee);
}

#[tokio::test]
async fn test_completed_at_tracks_status() {
    let f = fixture().await;
    let args = parse_create_task("title:x assigned_to:111", Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;

    let done = f
        .service
        .update_status(
            &f.employee,
            parse_update_status(&format!("{} completed", task.id)).unwrap(),
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(done.changed());
    assert!(done.task.completed_at.is_some());
    let stamped = done.task.completed_at;

    let again = f
        .service
        .update_status(
            &f.employee,
            UpdateStatusArgs {
                task_id: Some(task.id),
                status: TaskStatus::Completed,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(!again.changed());
    assert_eq!(again.task.completed_at, stamped);
    assert_eq!(again.task.updated_at, done.task.updated_at);

    let rejected = f
        .service
        .update_status(
            &f.admin,
            UpdateStatusArgs {
                task_id: Some(task.id),
                status: TaskStatus::Rejected,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.previous, TaskStatus::Completed);
    assert_eq!(rejected.task.completed_at, None);
}

#[tokio::test]
async fn test_not_found_is_reported_before_forbidden() {
    let f = fixture().await;

    for task_id in [None, Some(4242)] {
        let err = f
            .service
            .update_status(
                &f.other,
                UpdateStatusArgs {
                    task_id,
                    status: TaskStatus::InProgress,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskOpError::TaskNotFound));
    }
}

#[tokio::test]
async fn test_details_denied_to_other_employee() {
    let f = fixture().await;
    let args = parse_create_task(r#"title:"Secret plan" assigned_to:111"#, Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;

    let err = f
        .service
        .task_details(&f.other, Some(task.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(AuthzError::NotAssignee { .. })));
    assert!(!err.to_string().contains("Secret plan"));

    let details = f.service.task_details(&f.employee, Some(task.id)).await.unwrap();
    assert_eq!(details.task.id, task.id);
    assert_eq!(details.assignee.map(|u| u.id), Some(f.employee.id));
    assert_eq!(details.creator.map(|u| u.id), Some(f.admin.id));

    let err = f
        .service
        .update_status(
            &f.other,
            UpdateStatusArgs {
                task_id: Some(task.id),
                status: TaskStatus::Completed,
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(_)));
}

#[tokio::test]
async fn test_list_my_tasks_empty_and_scoped() {
    let f = fixture().await;
    assert!(f.service.list_my_tasks(&f.employee, None).await.unwrap().is_empty());

    for assignee in ["111", "111", "222"] {
        let args = parse_create_task(&format!("title:t assigned_to:{}", assignee), Utc::now()).unwrap();
        f.service.create_task(&f.admin, args).await.unwrap();
    }

    let mine = f.service.list_my_tasks(&f.employee, None).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|t| t.assignee_id == f.employee.id));
    assert!(mine[0].id > mine[1].id);

    let pending = f
        .service
        .list_my_tasks(&f.employee, Some(TaskStatus::Completed))
        .await
        .unwrap();
    assert!(pending.is_empty());

    let all = f
        .service
        .list_all_tasks(&f.admin, &parse_all_tasks("pending").unwrap())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_list_all_tasks_date_range_is_inclusive() {
    let f = fixture().await;
    let args = parse_create_task("title:t", Utc::now()).unwrap();
    let mut task = f.service.create_task(&f.admin, args).await.unwrap().task;

    task.created_at = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
    f.store.put_task(task).unwrap();

    let inside = f
        .service
        .list_all_tasks(&f.admin, &parse_all_tasks("from:2025-01-31 to:2025-01-31").unwrap())
        .await
        .unwrap();
    assert_eq!(inside.len(), 1);

    let outside = f
        .service
        .list_all_tasks(&f.admin, &parse_all_tasks("from:2025-02-01").unwrap())
        .await
        .unwrap();
    assert!(outside.is_empty());
}

#[tokio::test]
async fn test_change_role_and_allow_list() {
    let f = fixture().await;

    let err = f
        .service
        .change_role(
            &f.admin,
            SetRoleArgs {
                external_id: "555".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TaskOpError::UserNotFound(_)));

    f.service
        .allow_user(
            &f.admin,
            AllowUserArgs {
                handle: "anna".to_string(),
                role: Role::Employee,
            },
        )
        .await
        .unwrap();

    let promoted = f
        .service
        .change_role(
            &f.admin,
            SetRoleArgs {
                external_id: "111".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);

    let entry = f.store.find_allowed_user("ANNA").await.unwrap().unwrap();
    assert_eq!(entry.role, Role::Admin);
}

#[tokio::test]
async fn test_store_failure_is_infrastructure() {
    let f = fixture().await;
    f.store.set_unavailable(true);

    let err = f.service.list_my_tasks(&f.employee, None).await.unwrap_err();
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn test_history_follows_task_lifecycle() {
    let f = fixture().await;
    let args = parse_create_task(r#"title:"Audit" assigned_to:111"#, Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;
    let now = Utc::now();

    for status in ["in_progress", "in_progress", "rejected"] {
        let args = parse_update_status(&format!("{} {}", task.id, status)).unwrap();
        f.service.update_status(&f.employee, args, now).await.unwrap();
    }

    let history = f.service.task_history(&f.employee, Some(task.id)).await.unwrap();
    let changes: Vec<(HistoryChange, Option<&str>)> = history
        .lines
        .iter()
        .map(|line| (line.entry.change_type, line.entry.new_value.as_deref()))
        .collect();
    assert_eq!(
        changes,
        vec![
            (HistoryChange::Status, Some("rejected")),
            (HistoryChange::Status, Some("in_progress")),
            (HistoryChange::Created, Some("Audit")),
        ]
    );
    assert_eq!(history.lines[0].author.as_ref().map(|u| u.id), Some(f.employee.id));
    assert_eq!(history.lines[2].author.as_ref().map(|u| u.id), Some(f.admin.id));

    let err = f.service.task_history(&f.other, Some(task.id)).await.unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(_)));
}

#[tokio::test]
async fn test_history_is_capped() {
    let f = fixture().await;
    let args = parse_create_task("title:Busy", Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;

    for round in 0..25 {
        let status = if round % 2 == 0 { "in_progress" } else { "pending" };
        let args = parse_update_status(&format!("{} {}", task.id, status)).unwrap();
        f.service.update_status(&f.admin, args, Utc::now()).await.unwrap();
    }

    assert_eq!(f.store.history().unwrap().len(), 26);
    let history = f.service.task_history(&f.admin, Some(task.id)).await.unwrap();
    assert_eq!(history.lines.len() as i64, HISTORY_LIMIT);
}

#[tokio::test]
async fn test_comment_resolves_mentions() {
    let f = fixture().await;
    let args = parse_create_task(r#"title:"Audit" assigned_to:111"#, Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;

    let args = parse_comment(&format!("{} @Boss, @oleg and @nobody: done? @anna", task.id)).unwrap();
    let posted = f.service.add_comment(&f.employee, args, Utc::now()).await.unwrap();

    let notified: Vec<i64> = posted.notify.iter().map(|u| u.id).collect();
    assert_eq!(notified, vec![f.admin.id, f.other.id]);

    let comments = f.service.list_comments(&f.admin, Some(task.id)).await.unwrap();
    assert_eq!(comments.lines.len(), 1);
    assert_eq!(comments.lines[0].author.as_ref().map(|u| u.id), Some(f.employee.id));

    let last = f.store.history().unwrap().pop().unwrap();
    assert_eq!(last.change_type, HistoryChange::Comment);
}

#[tokio::test]
async fn test_comment_on_missing_or_foreign_task() {
    let f = fixture().await;
    let args = parse_create_task(r#"title:"Audit" assigned_to:111"#, Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;

    let args = parse_comment("999 hello").unwrap();
    let err = f.service.add_comment(&f.employee, args, Utc::now()).await.unwrap_err();
    assert!(matches!(err, TaskOpError::TaskNotFound));

    let args = parse_comment(&format!("{} hello", task.id)).unwrap();
    let err = f.service.add_comment(&f.other, args, Utc::now()).await.unwrap_err();
    assert!(matches!(err, TaskOpError::Forbidden(AuthzError::NotAssignee { .. })));
    assert!(f.service.list_comments(&f.admin, Some(task.id)).await.unwrap().lines.is_empty());
}

#[tokio::test]
async fn test_muted_and_quiet_users_are_not_notified() {
    let f = fixture().await;
    let args = parse_create_task(r#"title:"Audit" assigned_to:111"#, Utc::now()).unwrap();
    let task = f.service.create_task(&f.admin, args).await.unwrap().task;
    let noon = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();

    f.service
        .update_settings(&f.admin, parse_settings("comments off").unwrap(), noon)
        .await
        .unwrap();
    f.service
        .update_settings(&f.other, parse_settings("quiet 11:00-13:00").unwrap(), noon)
        .await
        .unwrap();

    let args = parse_comment(&format!("{} @boss @oleg", task.id)).unwrap();
    let posted = f.service.add_comment(&f.employee, args, noon).await.unwrap();
    assert!(posted.notify.is_empty());

    let args = parse_comment(&format!("{} @boss @oleg again", task.id)).unwrap();
    let later = noon + chrono::Duration::hours(2);
    let posted = f.service.add_comment(&f.employee, args, later).await.unwrap();
    let notified: Vec<i64> = posted.notify.iter().map(|u| u.id).collect();
    assert_eq!(notified, vec![f.other.id]);
}

#[tokio::test]
async fn test_settings_show_does_not_write() {
    let f = fixture().await;
    let now = Utc::now();

    let shown = f
        .service
        .update_settings(&f.employee, parse_settings("").unwrap(), now)
        .await
        .unwrap();
    assert!(shown.enabled(NotificationSetting::Overdue));

    let saved = f
        .service
        .update_settings(&f.employee, parse_settings("overdue off").unwrap(), now)
        .await
        .unwrap();
    assert!(!saved.enabled(NotificationSetting::Overdue));
    assert_eq!(saved.updated_at, now);
    assert_eq!(f.service.notification_settings(&f.employee).await.unwrap(), saved);
}
