//! End-to-end behaviour of the scheduling service over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clinic_scheduling::db::repositories::LocalRepository;
use clinic_scheduling::db::repository::BookingRepository;
use clinic_scheduling::models::{BookingId, BookingStatus, NewBooking, PractitionerRef};
use clinic_scheduling::services::{
    statistics, BookingFilter, Granularity, Reschedule, SchedulingError, SchedulingService,
};

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, h, m, 0).unwrap()
}

fn setup() -> (SchedulingService, LocalRepository) {
    let repo = LocalRepository::new();
    (SchedulingService::new(Arc::new(repo.clone())), repo)
}

fn dr_a(patient: &str, start: DateTime<Utc>) -> NewBooking {
    NewBooking::new(patient, start).with_practitioner("dr-a")
}

#[tokio::test]
async fn test_overlapping_create_is_rejected() {
    let (service, repo) = setup();
    let first = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();
    assert_eq!(first.end(), at(6, 9, 30));

    let err = service
        .create(dr_a("patient-2", at(6, 9, 15)))
        .await
        .unwrap_err();
    match err {
        SchedulingError::Conflict { existing, .. } => {
            assert_eq!(existing.unwrap().id, first.id);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(repo.booking_count(), 1);
}

#[tokio::test]
async fn test_back_to_back_create_succeeds() {
    let (service, _) = setup();
    service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();
    let second = service.create(dr_a("patient-2", at(6, 9, 30))).await.unwrap();
    assert_eq!(second.start, at(6, 9, 30));
}

#[tokio::test]
async fn test_cancelling_frees_the_slot() {
    let (service, _) = setup();
    let first = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();
    service.cancel(&first.id).await.unwrap();

    let replacement = service.create(dr_a("patient-2", at(6, 9, 0))).await;
    assert!(replacement.is_ok());
}

#[tokio::test]
async fn test_no_show_and_completed_never_block() {
    let (service, _) = setup();
    let a = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();
    let b = service.create(dr_a("patient-2", at(6, 10, 0))).await.unwrap();
    service
        .update_status(&a.id, BookingStatus::NoShow)
        .await
        .unwrap();
    service
        .update_status(&b.id, BookingStatus::Completed)
        .await
        .unwrap();

    service.create(dr_a("patient-3", at(6, 9, 0))).await.unwrap();
    service.create(dr_a("patient-4", at(6, 10, 0))).await.unwrap();
}

#[tokio::test]
async fn test_other_practitioner_and_unassigned_never_conflict() {
    let (service, _) = setup();
    service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();

    service
        .create(NewBooking::new("patient-2", at(6, 9, 0)).with_practitioner("dr-b"))
        .await
        .unwrap();
    service
        .create(NewBooking::new("patient-3", at(6, 9, 0)))
        .await
        .unwrap();
    service
        .create(NewBooking::new("patient-4", at(6, 9, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_week_listing_around_wednesday() {
    let (service, _) = setup();
    // Saturday before, Sunday start, Saturday end, Sunday after
    for (day, h) in [(4, 23), (5, 0), (11, 23), (12, 0)] {
        service
            .create(NewBooking::new("patient", at(day, h, 0)))
            .await
            .unwrap();
    }

    let reference = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
    let page = service
        .calendar_page(reference, Granularity::Week, 0)
        .unwrap();
    assert_eq!(page.start, at(5, 0, 0));
    assert_eq!(
        page.end,
        Utc.with_ymd_and_hms(2025, 1, 11, 23, 59, 59).unwrap() + Duration::milliseconds(999)
    );

    let bookings = service
        .list_by_period(reference, Granularity::Week, &BookingFilter::default())
        .await
        .unwrap();
    let starts: Vec<_> = bookings.iter().map(|b| b.start).collect();
    assert_eq!(starts, vec![at(5, 0, 0), at(11, 23, 0)]);
}

#[tokio::test]
async fn test_statistics_count_today() {
    let (service, _) = setup();
    let reference = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();

    // 3 today, 7 on other days of the month
    for h in [8, 12, 17] {
        service
            .create(NewBooking::new("patient", at(8, h, 0)))
            .await
            .unwrap();
    }
    for day in [2, 3, 14, 15, 20, 21, 30] {
        service
            .create(NewBooking::new("patient", at(day, 10, 0)))
            .await
            .unwrap();
    }

    let stats = service.statistics(reference).await.unwrap();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.today, 3);
    assert_eq!(stats.this_month, 10);
    assert_eq!(stats.by_status[&BookingStatus::Scheduled], 10);

    // The pure reducer agrees with the service
    let snapshot = service.list_all().await.unwrap();
    let direct = statistics::aggregate(&snapshot, reference, service.config().calendar_offset)
        .unwrap();
    assert_eq!(direct, stats);
}

#[tokio::test]
async fn test_reschedule_never_conflicts_with_own_slot() {
    let (service, _) = setup();
    let booking = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();

    let nudged = service
        .reschedule(&booking.id, Reschedule::to(at(6, 9, 15)))
        .await
        .unwrap();
    assert_eq!(nudged.start, at(6, 9, 15));
    assert_eq!(nudged.id, booking.id);

    let longer = service
        .reschedule(&booking.id, Reschedule::to(at(6, 9, 0)).with_duration(90))
        .await
        .unwrap();
    assert_eq!(longer.end(), at(6, 10, 30));
}

#[tokio::test]
async fn test_rejected_move_leaves_booking_untouched() {
    let (service, _) = setup();
    service.create(dr_a("patient-1", at(6, 10, 0))).await.unwrap();
    let booking = service.create(dr_a("patient-2", at(6, 9, 0))).await.unwrap();

    let err = service
        .reschedule(&booking.id, Reschedule::to(at(6, 9, 45)))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let unchanged = service.get(&booking.id).await.unwrap();
    assert_eq!(unchanged, booking);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (service, _) = setup();
    let booking = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();

    service.cancel(&booking.id).await.unwrap();
    let once = service.get(&booking.id).await.unwrap();
    service.cancel(&booking.id).await.unwrap();
    let twice = service.get(&booking.id).await.unwrap();

    assert_eq!(once.status, BookingStatus::Cancelled);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_duplicate_id_is_a_validation_error() {
    let (service, repo) = setup();
    let mut first = NewBooking::new("patient-1", at(6, 9, 0));
    first.id = Some(BookingId::new("fixed"));
    service.create(first).await.unwrap();

    let mut second = NewBooking::new("patient-2", at(7, 9, 0));
    second.id = Some(BookingId::new("fixed"));
    let err = service.create(second).await.unwrap_err();

    assert!(err.is_validation(), "unexpected {:?}", err);
    assert!(err.to_string().contains("fixed"));
    assert_eq!(repo.booking_count(), 1);
    assert_eq!(
        service.get(&BookingId::new("fixed")).await.unwrap().start,
        at(6, 9, 0)
    );
}

#[tokio::test]
async fn test_remove_is_a_hard_delete() {
    let (service, repo) = setup();
    let booking = service.create(dr_a("patient-1", at(6, 9, 0))).await.unwrap();

    service.remove(&booking.id).await.unwrap();
    assert_eq!(repo.booking_count(), 0);
    assert!(service.get(&booking.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_all_is_most_recent_first() {
    let (service, _) = setup();
    for day in [6, 20, 13] {
        service
            .create(NewBooking::new("patient", at(day, 9, 0)))
            .await
            .unwrap();
    }
    let all = service.list_all().await.unwrap();
    let days: Vec<_> = all.iter().map(|b| b.start).collect();
    assert_eq!(days, vec![at(20, 9, 0), at(13, 9, 0), at(6, 9, 0)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_one_slot_admit_exactly_one() {
    let (service, repo) = setup();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .create(dr_a(&format!("patient-{}", i), at(6, 9, 0)))
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(repo.booking_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cross_moves_keep_calendars_consistent() {
    let (service, repo) = setup();
    let mut ids = Vec::new();
    for (i, practitioner) in ["dr-a", "dr-b"].iter().enumerate() {
        let b = service
            .create(
                NewBooking::new(format!("patient-{}", i), at(6, 9, 0))
                    .with_practitioner(*practitioner),
            )
            .await
            .unwrap();
        ids.push(b.id);
    }

    // Each booking tries to take the other's slot at the same time
    let mut tasks = Vec::new();
    for (id, target) in [(ids[0].clone(), "dr-b"), (ids[1].clone(), "dr-a")] {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .reschedule(&id, Reschedule::to(at(6, 9, 0)).with_practitioner(target))
                .await
        }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    let all = repo.list_bookings().await.unwrap();
    for (i, a) in all.iter().enumerate() {
        for b in all.iter().skip(i + 1) {
            assert!(!a.collides_with(b), "{} collides with {}", a.id, b.id);
        }
    }
    assert_eq!(
        all.iter()
            .filter(|b| b.practitioner_ref == Some(PractitionerRef::new("dr-a")))
            .count()
            + all
                .iter()
                .filter(|b| b.practitioner_ref == Some(PractitionerRef::new("dr-b")))
                .count(),
        2
    );
}
