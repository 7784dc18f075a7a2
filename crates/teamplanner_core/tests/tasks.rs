use rusqlite::Connection;
use teamplanner_core::db::open_db_in_memory;
use teamplanner_core::{
    ErrorKind, GroupDraft, GroupService, NotificationKind, ServiceError, SqliteGroupRepository,
    SqliteNotificationStore, SqliteTaskRepository, SqliteUserRepository, TaskDraft, TaskFields,
    TaskFilter, TaskItem, TaskRepository, TaskService, TaskStatus, TaskUpdate, User, UserDraft,
    UserService,
};
use uuid::Uuid;

type Tasks<'conn> = TaskService<SqliteTaskRepository<'conn>, SqliteNotificationStore<'conn>>;

struct Fixture {
    conn: Connection,
    admin: User,
    member: User,
    outsider: User,
    group_id: Uuid,
}

impl Fixture {
    /// `ann` administers Alpha, `bob` is a member, `cat` is not.
    fn alpha() -> Self {
        let conn = open_db_in_memory().unwrap();
        let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap(), 1_000_000);
        let admin = users
            .register_profile(&UserDraft::new("ann@example.com", "Ann"))
            .unwrap();
        let member = users
            .register_profile(&UserDraft::new("bob@example.com", "Bob"))
            .unwrap();
        let outsider = users
            .register_profile(&UserDraft::new("cat@example.com", "Cat"))
            .unwrap();
        let group_id = GroupService::new(
            SqliteGroupRepository::try_new(&conn).unwrap(),
            SqliteNotificationStore::try_new(&conn).unwrap(),
        )
        .create_group(
            &GroupDraft {
                member_ids: vec![member.id],
                ..GroupDraft::new("Alpha")
            },
            admin.id,
        )
        .unwrap()
        .id;
        Self {
            conn,
            admin,
            member,
            outsider,
            group_id,
        }
    }

    fn tasks(&self) -> Tasks<'_> {
        TaskService::new(
            SqliteTaskRepository::try_new(&self.conn).unwrap(),
            SqliteNotificationStore::try_new(&self.conn).unwrap(),
        )
    }

    fn create(&self, fields: TaskFields, user: &User) -> TaskItem {
        self.tasks()
            .create_task(
                &TaskDraft {
                    group_id: self.group_id,
                    fields,
                },
                user.id,
            )
            .unwrap()
    }
}

#[test]
fn member_creates_task_in_own_group() {
    let fx = Fixture::alpha();
    let task = fx.create(TaskFields::new("  Draft agenda "), &fx.member);

    assert_eq!(task.title, "Draft agenda");
    assert_eq!(task.status, TaskStatus::ToDo);
    assert_eq!(task.completed_at, None);
    let loaded = fx.tasks().get_task(task.id, fx.admin.id).unwrap();
    assert_eq!(loaded, task);
}

#[test]
fn outsider_cannot_create_or_read_tasks() {
    let fx = Fixture::alpha();
    let draft = TaskDraft {
        group_id: fx.group_id,
        fields: TaskFields::new("Sneaky"),
    };
    let err = fx.tasks().create_task(&draft, fx.outsider.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupMember(_)));

    let task = fx.create(TaskFields::new("Private"), &fx.admin);
    let err = fx.tasks().get_task(task.id, fx.outsider.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!fx.tasks().can_access_task(task.id, fx.outsider.id).unwrap());
    assert!(fx.tasks().can_access_task(task.id, fx.member.id).unwrap());
    assert!(!fx.tasks().can_access_task(Uuid::new_v4(), fx.admin.id).unwrap());
}

#[test]
fn assignee_must_be_active_member() {
    let fx = Fixture::alpha();
    let draft = TaskDraft {
        group_id: fx.group_id,
        fields: TaskFields {
            assignee_id: Some(fx.outsider.id),
            ..TaskFields::new("Review budget")
        },
    };
    let err = fx.tasks().create_task(&draft, fx.admin.id).unwrap_err();
    assert!(matches!(err, ServiceError::AssigneeNotMember(id) if id == fx.outsider.id));

    let stored: i64 = fx
        .conn
        .query_row("SELECT COUNT(*) FROM task_items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);
    assert!(fx
        .tasks()
        .list_tasks(fx.group_id, &TaskFilter::default(), fx.admin.id)
        .unwrap()
        .is_empty());
}

#[test]
fn unknown_priority_is_rejected() {
    let fx = Fixture::alpha();
    let draft = TaskDraft {
        group_id: fx.group_id,
        fields: TaskFields {
            priority_id: Some(99),
            ..TaskFields::new("Review budget")
        },
    };
    let err = fx.tasks().create_task(&draft, fx.admin.id).unwrap_err();
    assert!(matches!(err, ServiceError::PriorityNotFound(99)));
}

#[test]
fn priorities_are_listed_by_level() {
    let fx = Fixture::alpha();
    let tasks = fx.tasks();
    let high = tasks.create_priority("High", 3).unwrap();
    tasks.create_priority("Low", 1).unwrap();
    tasks.create_priority("Medium", 2).unwrap();

    let names: Vec<String> = tasks
        .list_priorities()
        .unwrap()
        .into_iter()
        .map(|priority| priority.name)
        .collect();
    assert_eq!(names, vec!["Low", "Medium", "High"]);

    let task = fx.create(
        TaskFields {
            priority_id: Some(high.id),
            ..TaskFields::new("Ship release")
        },
        &fx.admin,
    );
    assert_eq!(task.priority_id, Some(high.id));

    let err = tasks.create_priority("  ", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn duplicate_priority_name_is_a_form_error() {
    let fx = Fixture::alpha();
    let tasks = fx.tasks();
    tasks.create_priority("Urgent", 4).unwrap();

    let err = tasks.create_priority(" Urgent ", 5).unwrap_err();
    assert!(matches!(err, ServiceError::DuplicatePriorityName(ref name) if name == "Urgent"));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(tasks.list_priorities().unwrap().len(), 1);
}

#[test]
fn assignee_or_admin_may_edit() {
    let fx = Fixture::alpha();
    let unassigned = fx.create(TaskFields::new("Unassigned"), &fx.admin);

    let update = TaskUpdate {
        task_id: unassigned.id,
        fields: TaskFields::new("Renamed by member"),
    };
    let err = fx.tasks().update_task(&update, fx.member.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotTaskEditor(_)));

    let assigned = fx.create(
        TaskFields {
            assignee_id: Some(fx.member.id),
            ..TaskFields::new("Assigned")
        },
        &fx.admin,
    );
    let update = TaskUpdate {
        task_id: assigned.id,
        fields: TaskFields {
            assignee_id: Some(fx.member.id),
            description: "notes".to_string(),
            ..TaskFields::new("Assigned, refined")
        },
    };
    let edited = fx.tasks().update_task(&update, fx.member.id).unwrap();
    assert_eq!(edited.title, "Assigned, refined");
    assert_eq!(edited.description, "notes");

    let by_admin = TaskUpdate {
        task_id: unassigned.id,
        fields: TaskFields::new("Renamed by admin"),
    };
    fx.tasks().update_task(&by_admin, fx.admin.id).unwrap();
}

#[test]
fn done_status_stamps_completion_and_reopen_clears_it() {
    let fx = Fixture::alpha();
    let task = fx.create(
        TaskFields {
            assignee_id: Some(fx.member.id),
            ..TaskFields::new("Write minutes")
        },
        &fx.admin,
    );

    let done = fx
        .tasks()
        .update_task_status(task.id, TaskStatus::Done, fx.member.id)
        .unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.completed_at.is_some());

    let reopened = fx
        .tasks()
        .update_task_status(task.id, TaskStatus::Blocked, fx.admin.id)
        .unwrap();
    assert_eq!(reopened.status, TaskStatus::Blocked);
    assert_eq!(reopened.completed_at, None);

    let stored = fx.tasks().get_task(task.id, fx.member.id).unwrap();
    assert_eq!(stored.status, TaskStatus::Blocked);
}

#[test]
fn assignment_and_status_changes_notify_the_assignee() {
    let fx = Fixture::alpha();
    let task = fx.create(
        TaskFields {
            assignee_id: Some(fx.member.id),
            ..TaskFields::new("Write minutes")
        },
        &fx.admin,
    );
    fx.tasks()
        .update_task_status(task.id, TaskStatus::InProgress, fx.admin.id)
        .unwrap();

    let store = SqliteNotificationStore::try_new(&fx.conn).unwrap();
    let kinds: Vec<NotificationKind> = store
        .list_for_user(fx.member.id, true)
        .unwrap()
        .into_iter()
        .map(|notice| notice.kind)
        .collect();
    assert!(kinds.contains(&NotificationKind::TaskAssigned));
    assert!(kinds.contains(&NotificationKind::TaskStatusChanged));
}

#[test]
fn delete_follows_edit_rules() {
    let fx = Fixture::alpha();
    let task = fx.create(TaskFields::new("Obsolete"), &fx.member);

    let err = fx.tasks().delete_task(task.id, fx.member.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotTaskEditor(_)));

    fx.tasks().delete_task(task.id, fx.admin.id).unwrap();
    let err = fx.tasks().get_task(task.id, fx.admin.id).unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(_)));
}

#[test]
fn list_filters_and_orders_newest_first() {
    let fx = Fixture::alpha();
    let repo = SqliteTaskRepository::try_new(&fx.conn).unwrap();
    for (offset, title, status) in [
        (1, "oldest", TaskStatus::Done),
        (2, "middle", TaskStatus::ToDo),
        (3, "newest", TaskStatus::ToDo),
    ] {
        repo.insert_task(&TaskItem {
            id: Uuid::new_v4(),
            group_id: fx.group_id,
            title: title.to_string(),
            description: String::new(),
            status,
            created_at: 1_000 + offset,
            deadline: None,
            assignee_id: None,
            priority_id: None,
            tags: None,
            completed_at: status.completed_at(1_000 + offset),
        })
        .unwrap();
    }

    let titles = |filter: &TaskFilter| -> Vec<String> {
        fx.tasks()
            .list_tasks(fx.group_id, filter, fx.member.id)
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect()
    };
    assert_eq!(
        titles(&TaskFilter::default()),
        vec!["newest", "middle", "oldest"]
    );
    assert_eq!(
        titles(&TaskFilter {
            status: Some(TaskStatus::ToDo),
            ..TaskFilter::default()
        }),
        vec!["newest", "middle"]
    );

    let err = fx
        .tasks()
        .list_tasks(fx.group_id, &TaskFilter::default(), fx.outsider.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupMember(_)));
}
