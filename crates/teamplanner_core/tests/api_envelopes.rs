use rusqlite::Connection;
use serde_json::Value;
use teamplanner_core::api::{
    feed_json, CalendarEventsController, GroupsController, RequestOutcome, TaskItemsController,
};
use teamplanner_core::db::open_db_in_memory;
use teamplanner_core::model::now_epoch_ms;
use teamplanner_core::{
    AttachmentUpload, CoreConfig, EventDraft, EventFields, EventWindow, GroupDraft, MemberRole,
    SqliteUserRepository, TaskDraft, TaskFields, User, UserDraft, UserService,
};
use uuid::Uuid;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

fn config() -> CoreConfig {
    CoreConfig::from_pairs(Vec::<(String, String)>::new()).unwrap()
}

fn register(conn: &Connection, email: &str) -> User {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap(), 1_000_000)
        .register_profile(&UserDraft::new(email, "Test User"))
        .unwrap()
}

fn group(controller: &GroupsController<'_>, name: &str, admin: &User, members: &[&User]) -> Uuid {
    let draft = GroupDraft {
        member_ids: members.iter().map(|user| user.id).collect(),
        ..GroupDraft::new(name)
    };
    controller.create(&draft, admin.id).ok().unwrap().id
}

#[test]
fn outcomes_map_to_http_statuses() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let cat = register(&conn, "cat@example.com");
    let groups = GroupsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[]);

    assert_eq!(groups.details(alpha, ann.id).http_status(), 200);
    assert_eq!(groups.details(alpha, cat.id), RequestOutcome::Forbidden);
    assert_eq!(groups.details(Uuid::new_v4(), ann.id).http_status(), 404);

    match groups.create(&GroupDraft::new("Alpha"), ann.id) {
        RequestOutcome::FormError { message } => assert!(message.contains("Alpha")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    match groups.create(&GroupDraft::new(""), ann.id) {
        RequestOutcome::FieldErrors(errors) => assert_eq!(errors[0].field, "name"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn group_page_flattens_details_and_admin_flag() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let groups = GroupsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[&bob]);

    let page = groups.details(alpha, bob.id).ok().unwrap();
    assert!(!page.is_admin);
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["group"]["name"], "Alpha");
    assert_eq!(value["members"].as_array().unwrap().len(), 2);
    assert_eq!(value["is_admin"], false);
}

#[test]
fn member_actions_answer_with_success_and_message() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let bob = register(&conn, "bob@example.com");
    let groups = GroupsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[&bob]);

    let refused = groups.remove_member(alpha, ann.id, ann.id);
    assert!(!refused.success);
    assert!(!refused.message.is_empty());

    let forbidden = groups.change_role(alpha, ann.id, MemberRole::Member, bob.id);
    assert!(!forbidden.success);

    let promoted = groups.change_role(alpha, bob.id, MemberRole::Admin, ann.id);
    assert!(promoted.success);
    assert_eq!(promoted.message, "Role updated to Admin.");

    let left = groups.leave_group(alpha, ann.id);
    assert!(left.success, "{}", left.message);
    let body: Value = serde_json::from_str(&left.to_json()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "You left the group.");

    let last = groups.leave_group(alpha, bob.id);
    assert!(last.success);
    assert!(last.message.contains("deleted"));
    assert_eq!(groups.index(bob.id).ok().unwrap().len(), 0);
}

#[test]
fn invitation_round_trip_through_controller() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let dan = register(&conn, "dan@example.com");
    let groups = GroupsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[]);

    let invitation = groups
        .create_invitation(alpha, "dan@example.com", MemberRole::Member, ann.id)
        .ok()
        .unwrap();
    let member = groups
        .accept_invitation(&invitation.token, dan.id)
        .ok()
        .unwrap();
    assert_eq!(member.group_id, alpha);
    assert_eq!(
        groups.accept_invitation(&invitation.token, dan.id).http_status(),
        400
    );
}

#[test]
fn task_details_include_attachments() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let groups = GroupsController::new(&conn, &config);
    let tasks = TaskItemsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[]);

    let task = tasks
        .create(
            &TaskDraft {
                group_id: alpha,
                fields: TaskFields {
                    deadline: Some(now_epoch_ms() + DAY_MS),
                    ..TaskFields::new("Collect receipts")
                },
            },
            ann.id,
        )
        .ok()
        .unwrap();
    let upload = AttachmentUpload {
        file_name: "receipt.png".to_string(),
        file_url: "/uploads/receipt.png".to_string(),
        size_bytes: 100,
    };
    let stored = tasks
        .upload_attachment(task.id, &upload, ann.id)
        .ok()
        .unwrap();

    let details = tasks.details(task.id, ann.id).ok().unwrap();
    assert_eq!(details.task.id, task.id);
    assert_eq!(details.attachments.len(), 1);

    let url = tasks.delete_attachment(stored.id, ann.id).ok().unwrap();
    assert_eq!(url, "/uploads/receipt.png");

    let too_big = AttachmentUpload {
        size_bytes: config.attachment_max_bytes + 1,
        ..upload
    };
    assert_eq!(
        tasks.upload_attachment(task.id, &too_big, ann.id).http_status(),
        422
    );
}

#[test]
fn calendar_feed_serializes_for_the_widget() {
    let conn = open_db_in_memory().unwrap();
    let config = config();
    let ann = register(&conn, "ann@example.com");
    let groups = GroupsController::new(&conn, &config);
    let events = CalendarEventsController::new(&conn, &config);
    let alpha = group(&groups, "Alpha", &ann, &[]);

    let start = now_epoch_ms() + DAY_MS;
    let event = events
        .create(
            &EventDraft {
                group_id: alpha,
                fields: EventFields {
                    end: Some(start + HOUR_MS),
                    recurrence_rule: Some("FREQ=DAILY;COUNT=3".to_string()),
                    ..EventFields::new("Standup", start, "Asia/Ho_Chi_Minh")
                },
            },
            ann.id,
        )
        .ok()
        .unwrap();

    let window = EventWindow {
        start: start - HOUR_MS,
        end: start + DAY_MS,
    };
    let group_items = events.get_events(alpha, window, ann.id).ok().unwrap();
    assert_eq!(group_items.len(), 1);
    assert_eq!(group_items[0].title, "Standup");

    let items = events.get_all_events(window, ann.id).ok().unwrap();
    let value: Value = serde_json::from_str(&feed_json(&items)).unwrap();
    let item = &value[0];
    assert_eq!(item["id"], event.id.to_string());
    assert_eq!(item["title"], "Standup (Alpha)");
    assert!(item["start"].as_str().unwrap().ends_with("+07:00"));
    assert_eq!(item["allDay"], false);
    assert_eq!(item["rrule"], "FREQ=DAILY;COUNT=3");
    assert_eq!(item["extendedProps"]["type"], "Meeting");
    assert_eq!(item["extendedProps"]["timeZone"], "Asia/Ho_Chi_Minh");
    assert_eq!(item["extendedProps"]["groupName"], "Alpha");

    let moved = events
        .update_event_time(event.id, start + HOUR_MS, Some(start + 2 * HOUR_MS), ann.id)
        .ok()
        .unwrap();
    assert_eq!(moved.start, start + HOUR_MS);
    assert!(events.delete(event.id, ann.id).is_ok());
    assert_eq!(events.details(event.id, ann.id), RequestOutcome::NotFound);
}
