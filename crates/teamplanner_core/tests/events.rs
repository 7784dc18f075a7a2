use rusqlite::Connection;
use teamplanner_core::db::open_db_in_memory;
use teamplanner_core::model::now_epoch_ms;
use teamplanner_core::{
    CalendarEvent, ErrorKind, EventDraft, EventFields, EventService, EventType, EventUpdate,
    EventWindow, GroupDraft, GroupService, NotificationKind, ServiceError, SqliteEventRepository,
    SqliteGroupRepository, SqliteNotificationStore, SqliteUserRepository, User, UserDraft,
    UserService,
};
use uuid::Uuid;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

type Events<'conn> = EventService<SqliteEventRepository<'conn>, SqliteNotificationStore<'conn>>;

struct Fixture {
    conn: Connection,
    admin: User,
    member: User,
    outsider: User,
    alpha: Uuid,
    beta: Uuid,
}

impl Fixture {
    /// `ann` administers Alpha and Beta, `bob` is a member of Alpha only.
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap(), 1_000_000);
        let register = |email: &str| {
            users
                .register_profile(&UserDraft::new(email, "Test User"))
                .unwrap()
        };
        let admin = register("ann@example.com");
        let member = register("bob@example.com");
        let outsider = register("cat@example.com");

        let groups = GroupService::new(
            SqliteGroupRepository::try_new(&conn).unwrap(),
            SqliteNotificationStore::try_new(&conn).unwrap(),
        );
        let alpha = groups
            .create_group(
                &GroupDraft {
                    member_ids: vec![member.id],
                    ..GroupDraft::new("Alpha")
                },
                admin.id,
            )
            .unwrap()
            .id;
        let beta = groups
            .create_group(&GroupDraft::new("Beta"), admin.id)
            .unwrap()
            .id;

        Self {
            conn,
            admin,
            member,
            outsider,
            alpha,
            beta,
        }
    }

    fn events(&self) -> Events<'_> {
        EventService::new(
            SqliteEventRepository::try_new(&self.conn).unwrap(),
            SqliteNotificationStore::try_new(&self.conn).unwrap(),
        )
    }

    fn schedule(&self, group_id: Uuid, fields: EventFields, user: &User) -> CalendarEvent {
        self.events()
            .create_event(&EventDraft { group_id, fields }, user.id)
            .unwrap()
    }

    fn try_schedule(&self, fields: EventFields) -> Result<CalendarEvent, ServiceError> {
        self.events().create_event(
            &EventDraft {
                group_id: self.alpha,
                fields,
            },
            self.admin.id,
        )
    }
}

fn tomorrow() -> i64 {
    now_epoch_ms() + DAY_MS
}

#[test]
fn member_schedules_event_and_others_are_notified() {
    let fx = Fixture::new();
    let start = tomorrow();
    let event = fx.schedule(
        fx.alpha,
        EventFields {
            end: Some(start + HOUR_MS),
            kind: EventType::Deadline,
            ..EventFields::new("Sprint review", start, "Asia/Ho_Chi_Minh")
        },
        &fx.member,
    );

    assert_eq!(event.group_id, fx.alpha);
    assert_eq!(event.kind, EventType::Deadline);
    assert_eq!(fx.events().get_event(event.id, fx.admin.id).unwrap(), event);

    let store = SqliteNotificationStore::try_new(&fx.conn).unwrap();
    let admin_notices = store.list_for_user(fx.admin.id, true).unwrap();
    assert!(admin_notices
        .iter()
        .any(|notice| notice.kind == NotificationKind::EventScheduled
            && notice.related_entity_id == Some(event.id.to_string())));
    assert!(!store
        .list_for_user(fx.member.id, true)
        .unwrap()
        .iter()
        .any(|notice| notice.kind == NotificationKind::EventScheduled));
}

#[test]
fn outsider_cannot_schedule_or_read() {
    let fx = Fixture::new();
    let draft = EventDraft {
        group_id: fx.alpha,
        fields: EventFields::new("Intrusion", tomorrow(), "UTC"),
    };
    let err = fx.events().create_event(&draft, fx.outsider.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupMember(_)));

    let event = fx.schedule(
        fx.alpha,
        EventFields::new("Standup", tomorrow(), "UTC"),
        &fx.admin,
    );
    assert!(!fx.events().can_access_event(event.id, fx.outsider.id).unwrap());
    assert!(fx.events().can_access_event(event.id, fx.member.id).unwrap());
    let err = fx.events().get_event(event.id, fx.outsider.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn schedule_rules_are_enforced() {
    let fx = Fixture::new();
    let start = tomorrow();

    let err = fx
        .try_schedule(EventFields::new("Past", now_epoch_ms() - HOUR_MS, "UTC"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::StartNotInFuture));

    let err = fx
        .try_schedule(EventFields {
            end: Some(start),
            ..EventFields::new("Zero length", start, "UTC")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::EndNotAfterStart));

    let err = fx
        .try_schedule(EventFields::new("Bad zone", start, "SE Asia Standard Time"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTimeZone(_)));

    let err = fx
        .try_schedule(EventFields {
            recurrence_rule: Some("FREQ=SOMETIMES".to_string()),
            ..EventFields::new("Bad rule", start, "UTC")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRecurrenceRule(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    let err = fx
        .try_schedule(EventFields {
            recurrence_rule: Some("FREQ=DAILY\nEXDATE:20300105T000000Z".to_string()),
            ..EventFields::new("Smuggled line", start, "UTC")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRecurrenceRule(_)));
}

#[test]
fn recurring_event_accepts_local_until() {
    let fx = Fixture::new();
    let event = fx
        .try_schedule(EventFields {
            recurrence_rule: Some("FREQ=DAILY;UNTIL=20991231".to_string()),
            ..EventFields::new("Daily check-in", tomorrow(), "Asia/Ho_Chi_Minh")
        })
        .unwrap();
    assert_eq!(
        event.recurrence_rule.as_deref(),
        Some("FREQ=DAILY;UNTIL=20991231")
    );
}

#[test]
fn recurring_event_keeps_its_rule() {
    let fx = Fixture::new();
    let event = fx
        .try_schedule(EventFields {
            recurrence_rule: Some("RRULE:FREQ=WEEKLY;BYDAY=MO;COUNT=4".to_string()),
            ..EventFields::new("Weekly sync", tomorrow(), "Europe/Berlin")
        })
        .unwrap();
    assert_eq!(
        event.recurrence_rule.as_deref(),
        Some("RRULE:FREQ=WEEKLY;BYDAY=MO;COUNT=4")
    );
}

#[test]
fn only_admins_edit_move_or_delete() {
    let fx = Fixture::new();
    let start = tomorrow();
    let event = fx.schedule(
        fx.alpha,
        EventFields::new("Planning", start, "UTC"),
        &fx.member,
    );

    let update = EventUpdate {
        event_id: event.id,
        fields: EventFields::new("Planning (moved)", start + DAY_MS, "UTC"),
    };
    let err = fx.events().update_event(&update, fx.member.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));
    let err = fx
        .events()
        .reschedule_event(event.id, start + HOUR_MS, None, fx.member.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));
    let err = fx.events().delete_event(event.id, fx.member.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupAdmin(_)));

    let edited = fx.events().update_event(&update, fx.admin.id).unwrap();
    assert_eq!(edited.title, "Planning (moved)");
    assert_eq!(edited.id, event.id);

    fx.events().delete_event(event.id, fx.admin.id).unwrap();
    let err = fx.events().get_event(event.id, fx.admin.id).unwrap_err();
    assert!(matches!(err, ServiceError::EventNotFound(_)));
}

#[test]
fn reschedule_checks_order_but_not_future_start() {
    let fx = Fixture::new();
    let event = fx.schedule(
        fx.alpha,
        EventFields::new("Retro", tomorrow(), "UTC"),
        &fx.admin,
    );

    let earlier = now_epoch_ms() - DAY_MS;
    let moved = fx
        .events()
        .reschedule_event(event.id, earlier, Some(earlier + HOUR_MS), fx.admin.id)
        .unwrap();
    assert_eq!(moved.start, earlier);
    assert_eq!(moved.end, Some(earlier + HOUR_MS));
    assert_eq!(moved.title, "Retro");

    let err = fx
        .events()
        .reschedule_event(event.id, earlier, Some(earlier - HOUR_MS), fx.admin.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::EndNotAfterStart));
}

#[test]
fn group_feed_returns_events_inside_window() {
    let fx = Fixture::new();
    let start = tomorrow();
    let inside = fx.schedule(
        fx.alpha,
        EventFields {
            end: Some(start + HOUR_MS),
            ..EventFields::new("Inside", start, "UTC")
        },
        &fx.admin,
    );
    let open_ended = fx.schedule(
        fx.alpha,
        EventFields::new("Open ended", start + 2 * HOUR_MS, "UTC"),
        &fx.admin,
    );
    fx.schedule(
        fx.alpha,
        EventFields {
            end: Some(start + 3 * DAY_MS),
            ..EventFields::new("Spills over", start, "UTC")
        },
        &fx.admin,
    );
    fx.schedule(
        fx.alpha,
        EventFields {
            end: Some(start + 5 * DAY_MS + HOUR_MS),
            ..EventFields::new("Later", start + 5 * DAY_MS, "UTC")
        },
        &fx.admin,
    );

    let window = EventWindow {
        start: start - HOUR_MS,
        end: start + DAY_MS,
    };
    let ids: Vec<Uuid> = fx
        .events()
        .group_feed(fx.alpha, window, fx.member.id)
        .unwrap()
        .into_iter()
        .map(|row| row.event.id)
        .collect();
    assert_eq!(ids, vec![inside.id, open_ended.id]);

    let err = fx
        .events()
        .group_feed(fx.alpha, window, fx.outsider.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotGroupMember(_)));
}

#[test]
fn user_feed_spans_active_groups_with_suffixed_titles() {
    let fx = Fixture::new();
    let start = tomorrow();
    fx.schedule(
        fx.alpha,
        EventFields::new("Standup", start, "UTC"),
        &fx.admin,
    );
    fx.schedule(
        fx.beta,
        EventFields::new("Budget", start + HOUR_MS, "UTC"),
        &fx.admin,
    );
    let window = EventWindow {
        start: start - HOUR_MS,
        end: start + DAY_MS,
    };

    let titles = |user: &User| -> Vec<String> {
        fx.events()
            .user_feed(window, user.id)
            .unwrap()
            .into_iter()
            .map(|row| row.event.title)
            .collect()
    };
    assert_eq!(titles(&fx.admin), vec!["Standup (Alpha)", "Budget (Beta)"]);
    assert_eq!(titles(&fx.member), vec!["Standup (Alpha)"]);
    assert!(titles(&fx.outsider).is_empty());

    GroupService::new(
        SqliteGroupRepository::try_new(&fx.conn).unwrap(),
        SqliteNotificationStore::try_new(&fx.conn).unwrap(),
    )
    .leave_group(fx.alpha, fx.member.id)
    .unwrap();
    assert!(titles(&fx.member).is_empty());
}
