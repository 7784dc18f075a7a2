use rusqlite::Connection;
use teamplanner_core::db::open_db_in_memory;
use teamplanner_core::{
    AttachmentService, AttachmentUpload, EventDraft, EventFields, EventService, GroupDraft,
    GroupRepository, GroupService, LeaveOutcome, MemberRole, MembershipLookup,
    NotificationKind, ServiceError, SqliteAttachmentRepository, SqliteEventRepository,
    SqliteGroupRepository, SqliteNotificationStore, SqliteTaskRepository, SqliteUserRepository,
    TaskDraft, TaskFields, TaskService, User, UserDraft, UserService,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

type Groups<'conn> = GroupService<SqliteGroupRepository<'conn>, SqliteNotificationStore<'conn>>;

fn groups(conn: &Connection) -> Groups<'_> {
    GroupService::new(
        SqliteGroupRepository::try_new(conn).unwrap(),
        SqliteNotificationStore::try_new(conn).unwrap(),
    )
}

fn register(conn: &Connection, email: &str) -> User {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap(), 1_000_000)
        .register_profile(&UserDraft::new(email, "Test User"))
        .unwrap()
}

fn alpha_with(conn: &Connection, admin: &User, members: &[&User]) -> uuid::Uuid {
    let draft = GroupDraft {
        member_ids: members.iter().map(|user| user.id).collect(),
        ..GroupDraft::new("Alpha")
    };
    groups(conn).create_group(&draft, admin.id).unwrap().id
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn removed_member_loses_access_and_tasks_are_unassigned() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);

    let tasks = TaskService::new(
        SqliteTaskRepository::try_new(&conn).unwrap(),
        SqliteNotificationStore::try_new(&conn).unwrap(),
    );
    let task = tasks
        .create_task(
            &TaskDraft {
                group_id,
                fields: TaskFields {
                    assignee_id: Some(bob.id),
                    ..TaskFields::new("Draft agenda")
                },
            },
            ann.id,
        )
        .unwrap();

    groups(&conn).remove_member(group_id, bob.id, ann.id).unwrap();

    let service = groups(&conn);
    assert!(!service.can_access_group(group_id, bob.id).unwrap());
    let reloaded = tasks.get_task(task.id, ann.id).unwrap();
    assert_eq!(reloaded.assignee_id, None);

    // The row is kept with a departure stamp.
    let repo = SqliteGroupRepository::try_new(&conn).unwrap();
    let row = repo.membership(group_id, bob.id).unwrap().unwrap();
    assert!(row.left_at.is_some());
    assert_eq!(repo.list_members(group_id, true).unwrap().len(), 2);
    assert_eq!(repo.list_members(group_id, false).unwrap().len(), 1);

    let store = SqliteNotificationStore::try_new(&conn).unwrap();
    assert!(store
        .list_for_user(bob.id, false)
        .unwrap()
        .iter()
        .any(|notice| notice.kind == NotificationKind::MemberRemoved));
}

#[test]
fn removed_member_can_be_invited_again() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    service.remove_member(group_id, bob.id, ann.id).unwrap();
    let member = service
        .invite_member(group_id, "  BOB@example.com ", ann.id)
        .unwrap();

    assert_eq!(member.user_id, bob.id);
    assert_eq!(member.role, MemberRole::Member);
    assert!(member.left_at.is_none());
    assert!(service.can_access_group(group_id, bob.id).unwrap());
}

#[test]
fn invite_rejects_active_member_and_unknown_email() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    let err = service
        .invite_member(group_id, "bob@example.com", ann.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyMember(id) if id == bob.id));

    let err = service
        .invite_member(group_id, "nobody@example.com", ann.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::UserNotFound(_)));

    let err = service
        .invite_member(group_id, "ann@example.com", bob.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));
}

#[test]
fn admin_cannot_remove_self_or_other_admins() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    let err = service.remove_member(group_id, ann.id, ann.id).unwrap_err();
    assert!(matches!(err, ServiceError::CannotRemoveSelf));

    service.assign_admin(group_id, bob.id, ann.id).unwrap();
    let err = service.remove_member(group_id, bob.id, ann.id).unwrap_err();
    assert!(matches!(err, ServiceError::CannotRemoveAdmin));
}

#[test]
fn removing_unknown_member_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let cat = register(&conn, "cat@example.com");
    let group_id = alpha_with(&conn, &ann, &[]);

    let err = groups(&conn)
        .remove_member(group_id, cat.id, ann.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::MemberNotFound { .. }));
}

#[test]
fn role_changes_follow_admin_rules() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    let err = service
        .change_role(group_id, ann.id, MemberRole::Admin, bob.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));

    let err = service
        .change_role(group_id, ann.id, MemberRole::Member, ann.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::CannotDemoteSelf));

    let promoted = service.assign_admin(group_id, bob.id, ann.id).unwrap();
    assert_eq!(promoted.role, MemberRole::Admin);
    assert!(service.is_admin(group_id, bob.id).unwrap());

    // A second admin may demote the first.
    let demoted = service
        .change_role(group_id, ann.id, MemberRole::Member, bob.id)
        .unwrap();
    assert_eq!(demoted.role, MemberRole::Member);
    assert!(!service.is_admin(group_id, ann.id).unwrap());

    let store = SqliteNotificationStore::try_new(&conn).unwrap();
    assert!(store
        .list_for_user(ann.id, true)
        .unwrap()
        .iter()
        .any(|notice| notice.kind == NotificationKind::RoleChanged));
}

#[test]
fn sole_admin_cannot_leave_while_members_remain() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    let err = service.leave_group(group_id, ann.id).unwrap_err();
    assert!(matches!(err, ServiceError::SoleAdminCannotLeave));

    service.assign_admin(group_id, bob.id, ann.id).unwrap();
    assert_eq!(
        service.leave_group(group_id, ann.id).unwrap(),
        LeaveOutcome::Left
    );
    assert!(!service.can_access_group(group_id, ann.id).unwrap());
    assert!(service.is_admin(group_id, bob.id).unwrap());
}

#[test]
fn member_leaving_is_soft() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let service = groups(&conn);

    assert_eq!(
        service.leave_group(group_id, bob.id).unwrap(),
        LeaveOutcome::Left
    );
    let err = service.leave_group(group_id, bob.id).unwrap_err();
    assert!(matches!(err, ServiceError::MemberNotFound { .. }));
}

#[test]
fn last_member_leaving_deletes_the_group() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let group_id = alpha_with(&conn, &ann, &[]);
    let service = groups(&conn);

    assert_eq!(
        service.leave_group(group_id, ann.id).unwrap(),
        LeaveOutcome::GroupDeleted
    );
    let err = service.group_details(group_id, ann.id).unwrap_err();
    assert!(matches!(err, ServiceError::GroupNotFound(_)));
    assert_eq!(count(&conn, "group_members"), 0);
}

#[test]
fn empty_group_is_kept_when_configured() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let group_id = alpha_with(&conn, &ann, &[]);
    let service = groups(&conn).with_delete_empty_groups(false);

    assert_eq!(
        service.leave_group(group_id, ann.id).unwrap(),
        LeaveOutcome::Left
    );
    let repo = SqliteGroupRepository::try_new(&conn).unwrap();
    assert!(repo.get_group(group_id).unwrap().is_some());
    assert!(repo.list_members(group_id, false).unwrap().is_empty());
}

#[test]
fn delete_group_removes_all_dependent_rows() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let group_id = alpha_with(&conn, &ann, &[&bob]);
    let now = teamplanner_core::model::now_epoch_ms();

    let tasks = TaskService::new(
        SqliteTaskRepository::try_new(&conn).unwrap(),
        SqliteNotificationStore::try_new(&conn).unwrap(),
    );
    let task = tasks
        .create_task(
            &TaskDraft {
                group_id,
                fields: TaskFields::new("Book room"),
            },
            ann.id,
        )
        .unwrap();
    let events = EventService::new(
        SqliteEventRepository::try_new(&conn).unwrap(),
        SqliteNotificationStore::try_new(&conn).unwrap(),
    );
    let event = events
        .create_event(
            &EventDraft {
                group_id,
                fields: EventFields::new("Kickoff", now + DAY_MS, "UTC"),
            },
            ann.id,
        )
        .unwrap();
    let files = AttachmentService::new(
        SqliteAttachmentRepository::try_new(&conn).unwrap(),
        10 * 1024 * 1024,
    );
    let upload = AttachmentUpload {
        file_name: "notes.pdf".to_string(),
        file_url: "/uploads/notes.pdf".to_string(),
        size_bytes: 2048,
    };
    files.attach_to_task(task.id, &upload, ann.id).unwrap();
    files.attach_to_event(event.id, &upload, ann.id).unwrap();

    let err = groups(&conn).delete_group(group_id, bob.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));

    groups(&conn).delete_group(group_id, ann.id).unwrap();

    for table in [
        "team_groups",
        "group_members",
        "task_items",
        "calendar_events",
        "file_attachments",
    ] {
        assert_eq!(count(&conn, table), 0, "{table} should be empty");
    }
    let store = SqliteNotificationStore::try_new(&conn).unwrap();
    assert!(store
        .list_for_user(bob.id, true)
        .unwrap()
        .iter()
        .any(|notice| notice.kind == NotificationKind::GroupDeleted));
}
