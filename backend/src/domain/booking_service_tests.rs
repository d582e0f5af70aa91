//! Tests for the booking lifecycle service.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mockall::predicate::eq;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ports::{MockBookingRepository, MockHistoryRepository};
use crate::domain::{CapacityGuard, CapacityRejection, ErrorCode};
use crate::test_support::{FixtureClock, booking_request, citizen, staff};

type TestService = BookingLifecycleService<MockBookingRepository, MockHistoryRepository>;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).expect("valid time")
}

/// Sunday 2025-06-01, 09:00 UTC.
fn clock() -> Arc<FixtureClock> {
    Arc::new(FixtureClock::on(date(2025, 6, 1), 9))
}

fn make_service(bookings: MockBookingRepository, history: MockHistoryRepository) -> TestService {
    BookingLifecycleService::new(
        Arc::new(bookings),
        Arc::new(history),
        BookingPolicy::default(),
        clock(),
    )
}

fn stored(id: i64, state: BookingState) -> Booking {
    Booking::new(
        BookingId::new(id),
        NewBooking {
            municipality: Municipality::new("Lisbon").expect("valid municipality"),
            village: None,
            district: Some("Lisboa".to_owned()),
            postal_code: None,
            date: date(2025, 6, 2),
            time: time(10, 0),
            description: "old sofa".to_owned(),
            token: BookingToken::generate(),
            state,
            created_by: ActorId::new("ana@example.pt").expect("valid actor"),
        },
    )
}

fn expect_found(repo: &mut MockBookingRepository, booking: Booking) {
    repo.expect_find_by_id()
        .with(eq(booking.id()))
        .return_once(move |_| Ok(Some(booking)));
}

#[fixture]
fn monday() -> NaiveDate {
    date(2025, 6, 2)
}

#[rstest]
#[tokio::test]
async fn create_stores_received_booking_without_history(monday: NaiveDate) {
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_insert_within_capacity()
        .times(1)
        .withf(|draft, guard| {
            draft.state == BookingState::Received
                && draft.municipality.as_ref() == "Lisbon"
                && draft.created_by.as_ref() == "ana@example.pt"
                && guard.daily_cap() == 10
        })
        .returning(|draft, _| Ok(CapacityOutcome::Inserted(Booking::new(BookingId::new(1), draft))));
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();

    let service = make_service(bookings, history);
    let booking = service
        .create(booking_request("Lisbon", monday, 9), &citizen("ana@example.pt"))
        .await
        .expect("booking created");

    assert_eq!(booking.id(), BookingId::new(1));
    assert_eq!(booking.state(), BookingState::Received);
    assert!(!booking.token().as_ref().is_empty());
}

#[rstest]
#[tokio::test]
async fn create_generates_distinct_tokens(monday: NaiveDate) {
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_insert_within_capacity()
        .times(2)
        .returning(|draft, _| Ok(CapacityOutcome::Inserted(Booking::new(BookingId::new(1), draft))));
    let service = make_service(bookings, MockHistoryRepository::new());
    let actor = citizen("ana@example.pt");

    let first = service
        .create(booking_request("Lisbon", monday, 9), &actor)
        .await
        .expect("first booking");
    let second = service
        .create(booking_request("Lisbon", monday, 10), &actor)
        .await
        .expect("second booking");

    assert_ne!(first.token(), second.token());
}

#[rstest]
#[case::past_date(date(2025, 5, 30), time(9, 0), "cannot book a past date")]
#[case::before_opening(date(2025, 6, 2), time(7, 59), "bookings are only allowed between 08:00 and 17:00")]
#[case::after_closing(date(2025, 6, 2), time(17, 1), "bookings are only allowed between 08:00 and 17:00")]
#[case::saturday(date(2025, 6, 7), time(9, 0), "bookings are not possible on Saturday")]
#[case::sunday_today(date(2025, 6, 1), time(9, 0), "bookings are not possible on Sunday")]
#[case::past_wins_over_hours(date(2025, 5, 30), time(20, 0), "cannot book a past date")]
#[tokio::test]
async fn create_rejects_schedule_violations_before_touching_the_store(
    #[case] day: NaiveDate,
    #[case] at: NaiveTime,
    #[case] expected: &str,
) {
    let mut bookings = MockBookingRepository::new();
    bookings.expect_insert_within_capacity().never();
    let service = make_service(bookings, MockHistoryRepository::new());
    let mut request = booking_request("Lisbon", day, 9);
    request.time = at;

    let err = service
        .create(request, &citizen("ana@example.pt"))
        .await
        .expect_err("schedule violation");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), expected);
    assert!(err.is_invalid_argument());
}

#[rstest]
#[case::opening(time(8, 0))]
#[case::closing(time(17, 0))]
#[tokio::test]
async fn create_accepts_window_bounds(monday: NaiveDate, #[case] at: NaiveTime) {
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_insert_within_capacity()
        .times(1)
        .returning(|draft, _| Ok(CapacityOutcome::Inserted(Booking::new(BookingId::new(5), draft))));
    let service = make_service(bookings, MockHistoryRepository::new());
    let mut request = booking_request("Lisbon", monday, 9);
    request.time = at;

    let booking = service
        .create(request, &citizen("ana@example.pt"))
        .await
        .expect("bound is inclusive");

    assert_eq!(booking.time(), at);
}

#[rstest]
#[tokio::test]
async fn create_rejects_blank_municipality(monday: NaiveDate) {
    let mut bookings = MockBookingRepository::new();
    bookings.expect_insert_within_capacity().never();
    let service = make_service(bookings, MockHistoryRepository::new());

    let err = service
        .create(booking_request("   ", monday, 9), &citizen("ana@example.pt"))
        .await
        .expect_err("blank municipality");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn create_reports_capacity_rejection_with_details(monday: NaiveDate) {
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_insert_within_capacity()
        .times(1)
        .returning(|draft, guard: CapacityGuard| {
            Ok(CapacityOutcome::Rejected(CapacityRejection {
                municipality: draft.municipality,
                date: draft.date,
                current: 10,
                daily_cap: guard.daily_cap(),
            }))
        });
    let service = make_service(bookings, MockHistoryRepository::new());

    let err = service
        .create(booking_request("Lisbon", monday, 9), &citizen("ana@example.pt"))
        .await
        .expect_err("capacity reached");

    assert_eq!(err.code(), ErrorCode::CapacityExceeded);
    assert!(err.is_invalid_argument());
    assert!(err.message().contains("Lisbon"));
    assert_eq!(
        err.details(),
        Some(&json!({ "municipality": "Lisbon", "date": "2025-06-02", "dailyCap": 10 }))
    );
}

#[rstest]
#[tokio::test]
async fn create_maps_store_outage_to_service_unavailable(monday: NaiveDate) {
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_insert_within_capacity()
        .returning(|_, _| Err(BookingRepositoryError::connection("refused")));
    let service = make_service(bookings, MockHistoryRepository::new());

    let err = service
        .create(booking_request("Lisbon", monday, 9), &citizen("ana@example.pt"))
        .await
        .expect_err("store down");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn update_to_same_state_writes_nothing() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(3, BookingState::Assigned));
    bookings.expect_transition().never();
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let booking = service
        .update_state(BookingId::new(3), BookingState::Assigned, &staff("op@cm-lisboa.pt"))
        .await
        .expect("no-op succeeds");

    assert_eq!(booking.state(), BookingState::Assigned);
}

#[rstest]
#[case(BookingState::Received, BookingState::Done)]
#[case(BookingState::Received, BookingState::InProgress)]
#[case(BookingState::Assigned, BookingState::Received)]
#[case(BookingState::Done, BookingState::Canceled)]
#[case(BookingState::Canceled, BookingState::Received)]
#[tokio::test]
async fn illegal_transition_leaves_booking_untouched(
    #[case] from: BookingState,
    #[case] to: BookingState,
) {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(4, from));
    bookings.expect_transition().never();
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let err = service
        .update_state(BookingId::new(4), to, &staff("op@cm-lisboa.pt"))
        .await
        .expect_err("illegal transition");

    assert_eq!(err.code(), ErrorCode::IllegalTransition);
    assert_eq!(
        err.message(),
        format!("invalid state transition: {from} -> {to}")
    );
    assert_eq!(
        err.details(),
        Some(&json!({ "from": from.as_str(), "to": to.as_str() }))
    );
}

#[tokio::test]
async fn legal_transition_carries_one_record_stamped_by_the_clock() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(5, BookingState::Received));
    let expected_at = Utc
        .with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    bookings
        .expect_transition()
        .times(1)
        .withf(move |expected, record| {
            *expected == BookingState::Received
                && record.booking_id() == BookingId::new(5)
                && record.state() == BookingState::Assigned
                && record.changed_by().as_ref() == "op@cm-lisboa.pt"
                && record.changed_at() == expected_at
        })
        .returning(|_, record| Ok(stored(5, record.state())));
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let booking = service
        .update_state(BookingId::new(5), BookingState::Assigned, &staff("op@cm-lisboa.pt"))
        .await
        .expect("legal transition");

    assert_eq!(booking.state(), BookingState::Assigned);
}

#[rstest]
#[case(BookingState::Received)]
#[case(BookingState::Assigned)]
#[case(BookingState::InProgress)]
#[tokio::test]
async fn cancel_succeeds_from_non_terminal_states(#[case] from: BookingState) {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(6, from));
    bookings
        .expect_transition()
        .times(1)
        .withf(move |expected, record| {
            *expected == from
                && record.booking_id() == BookingId::new(6)
                && record.state() == BookingState::Canceled
        })
        .returning(|_, record| Ok(stored(6, record.state())));
    let service = make_service(bookings, MockHistoryRepository::new());

    let booking = service
        .cancel(BookingId::new(6), &citizen("ana@example.pt"))
        .await
        .expect("cancel succeeds");

    assert_eq!(booking.state(), BookingState::Canceled);
}

#[rstest]
#[case(BookingState::Done)]
#[case(BookingState::Canceled)]
#[tokio::test]
async fn cancel_from_terminal_state_is_illegal(#[case] from: BookingState) {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(7, from));
    bookings.expect_transition().never();
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let err = service
        .cancel(BookingId::new(7), &citizen("ana@example.pt"))
        .await
        .expect_err("terminal booking");

    assert_eq!(err.code(), ErrorCode::IllegalTransition);
}

#[tokio::test]
async fn lost_race_surfaces_as_concurrency_conflict_without_history() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(8, BookingState::Assigned));
    bookings
        .expect_transition()
        .returning(|_, record| Err(BookingRepositoryError::conflict(record.booking_id().get())));
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let err = service
        .update_state(BookingId::new(8), BookingState::InProgress, &staff("op@cm-lisboa.pt"))
        .await
        .expect_err("conflict");

    assert_eq!(err.code(), ErrorCode::ConcurrencyConflict);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn row_vanishing_mid_transition_is_not_found() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(9, BookingState::Assigned));
    bookings
        .expect_transition()
        .returning(|_, record| Err(BookingRepositoryError::missing(record.booking_id().get())));
    let service = make_service(bookings, MockHistoryRepository::new());

    let err = service
        .update_state(BookingId::new(9), BookingState::InProgress, &staff("op@cm-lisboa.pt"))
        .await
        .expect_err("missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(BookingState::Assigned)]
#[case(BookingState::Canceled)]
#[tokio::test]
async fn unknown_booking_is_not_found(#[case] target: BookingState) {
    let mut bookings = MockBookingRepository::new();
    bookings.expect_find_by_id().returning(|_| Ok(None));
    bookings.expect_transition().never();
    let service = make_service(bookings, MockHistoryRepository::new());
    let actor = staff("op@cm-lisboa.pt");

    let err = if target == BookingState::Canceled {
        service.cancel(BookingId::new(404), &actor).await
    } else {
        service.update_state(BookingId::new(404), target, &actor).await
    }
    .expect_err("not found");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "booking 404 not found");
}

#[tokio::test]
async fn failed_history_write_rolls_the_transition_back() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(10, BookingState::InProgress));
    bookings
        .expect_transition()
        .times(1)
        .withf(|expected, record| {
            *expected == BookingState::InProgress && record.state() == BookingState::Done
        })
        .returning(|_, _| Err(BookingRepositoryError::history_write(10_i64, "disk full")));
    let mut history = MockHistoryRepository::new();
    history.expect_append().never();
    let service = make_service(bookings, history);

    let err = service
        .update_state(BookingId::new(10), BookingState::Done, &staff("op@cm-lisboa.pt"))
        .await
        .expect_err("history write failed");

    assert_eq!(err.code(), ErrorCode::HistoryWriteFailed);
    assert!(err.message().contains("was not moved"));
    assert!(!err.is_retryable());
    assert_eq!(err.details(), Some(&json!({ "bookingId": 10 })));
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_token_lookup_is_absent_without_querying(#[case] token: &str) {
    let mut bookings = MockBookingRepository::new();
    bookings.expect_find_by_token().never();
    let service = make_service(bookings, MockHistoryRepository::new());

    let found = service.get_by_token(token).await.expect("lookup succeeds");

    assert!(found.is_none());
}

#[tokio::test]
async fn token_lookup_returns_the_stored_booking() {
    let booking = stored(11, BookingState::Received);
    let token = booking.token().clone();
    let raw = token.to_string();
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_find_by_token()
        .withf(move |candidate| *candidate == token)
        .return_once(move |_| Ok(Some(booking)));
    let service = make_service(bookings, MockHistoryRepository::new());

    let found = service.get_by_token(&raw).await.expect("lookup succeeds");

    assert_eq!(found.map(|b| b.id()), Some(BookingId::new(11)));
}

#[tokio::test]
async fn history_of_unknown_booking_is_not_found() {
    let mut bookings = MockBookingRepository::new();
    bookings.expect_find_by_id().returning(|_| Ok(None));
    let mut history = MockHistoryRepository::new();
    history.expect_find_by_booking_id_ordered().never();
    let service = make_service(bookings, history);

    let err = service
        .history(BookingId::new(12))
        .await
        .expect_err("not found");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn history_read_failure_maps_to_internal_error() {
    let mut bookings = MockBookingRepository::new();
    expect_found(&mut bookings, stored(13, BookingState::Assigned));
    let mut history = MockHistoryRepository::new();
    history
        .expect_find_by_booking_id_ordered()
        .returning(|_| Err(HistoryRepositoryError::query("syntax error")));
    let service = make_service(bookings, history);

    let err = service
        .history(BookingId::new(13))
        .await
        .expect_err("read failure");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn available_slots_skip_occupied_times(monday: NaiveDate) {
    let occupied = stored(14, BookingState::Received);
    let freed = stored(15, BookingState::Canceled);
    let lisbon = Municipality::new("Lisbon").expect("valid municipality");
    let mut bookings = MockBookingRepository::new();
    bookings
        .expect_find_by_municipality_and_date()
        .withf(move |municipality, day| municipality.as_ref() == "Lisbon" && *day == monday)
        .return_once(move |_, _| Ok(vec![occupied, freed]));
    let service = make_service(bookings, MockHistoryRepository::new());

    let slots = service
        .available_slots(&lisbon, monday)
        .await
        .expect("slots listed");

    assert_eq!(slots.len(), 9);
    assert!(!slots.contains(&time(10, 0)));
    assert_eq!(slots.first(), Some(&time(8, 0)));
}
