//! Tour service layer - tour management and phase reconciliation

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    resolve_status, CreateTourRequest, ListToursQuery, Tour, TourDetails, TourSchedule,
    TourStatus, UpdateTourRequest,
};
use crate::booking::BookingStatus;
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::events::{BookingEvent, EventBus};
use crate::models::{Caller, UserRole};
use crate::store::{BookingFilter, BookingPatch, Store, TourFilter, TourPatch};

/// Admins manage every tour, agencies only their own
pub fn can_manage(caller: &Caller, tour: &Tour) -> bool {
    match caller {
        Caller::User {
            role: UserRole::Admin,
            ..
        } => true,
        Caller::User {
            user_id,
            role: UserRole::Agency,
        } => *user_id == tour.agency_id,
        _ => false,
    }
}

/// Tours moved by one phase-advancement pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PhaseAdvance {
    pub started: Vec<Uuid>,
    pub completed: Vec<Uuid>,
    pub rescheduled: Vec<Uuid>,
    /// Bookings completed because their tour completed
    pub bookings_completed: Vec<Uuid>,
}

impl PhaseAdvance {
    pub fn tours_changed(&self) -> usize {
        self.started.len() + self.completed.len() + self.rescheduled.len()
    }
}

/// Tour service for managing tours and their phases
#[derive(Clone)]
pub struct TourService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl TourService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Create a tour owned by the calling agency
    pub async fn create_tour(&self, caller: &Caller, request: CreateTourRequest) -> CoreResult<Tour> {
        let agency_id = match caller {
            Caller::User {
                user_id,
                role: UserRole::Agency | UserRole::Admin,
            } => *user_id,
            _ => {
                return Err(CoreError::Forbidden(
                    "only agencies can create tours".to_string(),
                ))
            }
        };

        let schedule = TourSchedule::from_parts(request.start_date, request.end_date)?;
        let now = self.clock.now();

        let mut tour = Tour {
            id: Uuid::new_v4(),
            agency_id,
            name: request.name,
            location: request.location,
            price: request.price,
            max_participants: request.max_participants,
            start_date: schedule.map(|s| s.start_date),
            end_date: schedule.map(|s| s.end_date),
            tour_status: TourStatus::Upcoming,
            is_active: true,
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };
        tour.tour_status = resolve_status(&tour, now);

        let tour = self.store.insert_tour(&tour).await?;
        tracing::info!(tour_id = %tour.id, agency_id = %agency_id, "Tour created");
        Ok(tour)
    }

    /// Edit price, capacity, schedule or the active flag
    pub async fn update_tour(
        &self,
        caller: &Caller,
        tour_id: Uuid,
        request: UpdateTourRequest,
    ) -> CoreResult<Tour> {
        let tour = self.load(tour_id).await?;
        if !can_manage(caller, &tour) {
            return Err(CoreError::Forbidden(
                "not allowed to edit this tour".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut patch = TourPatch::at(now);
        if let Some(price) = request.price {
            patch = patch.price(price);
        }
        if let Some(max) = request.max_participants {
            patch = patch.max_participants(max);
        }
        if let Some(is_active) = request.is_active {
            patch = patch.is_active(is_active);
        }
        if request.start_date.is_some() || request.end_date.is_some() {
            let schedule = TourSchedule::from_parts(
                request.start_date.or(tour.start_date),
                request.end_date.or(tour.end_date),
            )?;
            if let Some(schedule) = schedule {
                patch = patch.schedule(schedule);
            }
        }

        let mut preview = tour.clone();
        patch.apply(&mut preview);
        let phase = resolve_status(&preview, now);
        if phase != tour.tour_status {
            patch = patch.tour_status(phase);
        }

        let guard = TourFilter::new().status(tour.tour_status);
        let updated = self
            .store
            .update_tour(tour_id, &guard, &patch)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("tour {} changed concurrently", tour_id)))?;

        if phase != tour.tour_status {
            self.events.publish(BookingEvent::TourPhaseChanged {
                tour_id,
                status: phase,
            });
            if phase == TourStatus::Completed {
                self.complete_tour_bookings(vec![tour_id], now).await?;
            }
        }

        tracing::info!(tour_id = %tour_id, "Tour updated");
        Ok(updated)
    }

    /// Cancel a tour; cancelled is terminal
    pub async fn cancel_tour(&self, caller: &Caller, tour_id: Uuid) -> CoreResult<Tour> {
        let tour = self.load(tour_id).await?;
        if !can_manage(caller, &tour) {
            return Err(CoreError::Forbidden(
                "not allowed to cancel this tour".to_string(),
            ));
        }
        if tour.tour_status == TourStatus::Cancelled {
            return Err(CoreError::InvalidTransition {
                from: TourStatus::Cancelled.as_str(),
                to: TourStatus::Cancelled.as_str(),
            });
        }

        let patch = TourPatch::at(self.clock.now()).tour_status(TourStatus::Cancelled);
        let guard = TourFilter::new().status(tour.tour_status);
        let cancelled = self
            .store
            .update_tour(tour_id, &guard, &patch)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("tour {} changed concurrently", tour_id)))?;

        self.events.publish(BookingEvent::TourPhaseChanged {
            tour_id,
            status: TourStatus::Cancelled,
        });
        tracing::info!(tour_id = %tour_id, "Tour cancelled");
        Ok(cancelled)
    }

    /// Get a tour with its phase resolved and written back
    pub async fn get_tour(&self, tour_id: Uuid) -> CoreResult<TourDetails> {
        let tour = self.load(tour_id).await?;
        let tour = self.sync_phase(tour).await?;
        Ok(self.details(tour))
    }

    /// List tours, each resolved and written back before filtering by phase
    pub async fn list_tours(&self, query: ListToursQuery) -> CoreResult<Vec<TourDetails>> {
        let mut filter = TourFilter::new();
        if !query.include_inactive.unwrap_or(false) {
            filter = filter.is_active(true);
        }
        if let Some(agency_id) = query.agency_id {
            filter = filter.agency(agency_id);
        }

        let mut details = Vec::new();
        for tour in self.store.find_tours(&filter).await? {
            let tour = self.sync_phase(tour).await?;
            if query.status.map_or(true, |status| status == tour.tour_status) {
                details.push(self.details(tour));
            }
        }
        Ok(details)
    }

    /// Resolve the phase of `tour`, persisting it when the stored one is stale
    pub async fn resolve_tour_status(&self, tour: &Tour) -> CoreResult<TourStatus> {
        let synced = self.sync_phase(tour.clone()).await?;
        Ok(synced.tour_status)
    }

    /// Set-based phase advancement over every dated, non-cancelled tour
    pub async fn advance_phases(&self, now: DateTime<Utc>) -> CoreResult<PhaseAdvance> {
        let started = self
            .store
            .update_tours(
                &TourFilter::new()
                    .statuses([TourStatus::Upcoming, TourStatus::Completed])
                    .starts_at_or_before(now)
                    .ends_at_or_after(now),
                &TourPatch::at(now).tour_status(TourStatus::Ongoing),
            )
            .await?;

        let completed = self
            .store
            .update_tours(
                &TourFilter::new()
                    .statuses([TourStatus::Upcoming, TourStatus::Ongoing])
                    .ends_before(now),
                &TourPatch::at(now).tour_status(TourStatus::Completed),
            )
            .await?;

        let rescheduled = self
            .store
            .update_tours(
                &TourFilter::new()
                    .statuses([TourStatus::Ongoing, TourStatus::Completed])
                    .starts_after(now),
                &TourPatch::at(now).tour_status(TourStatus::Upcoming),
            )
            .await?;

        for tour in started.iter().chain(&completed).chain(&rescheduled) {
            tracing::info!(tour_id = %tour.id, status = tour.tour_status.as_str(), "Tour phase advanced");
            self.events.publish(BookingEvent::TourPhaseChanged {
                tour_id: tour.id,
                status: tour.tour_status,
            });
        }

        let completed_ids: Vec<Uuid> = completed.iter().map(|t| t.id).collect();
        let bookings_completed = self.complete_tour_bookings(completed_ids.clone(), now).await?;

        Ok(PhaseAdvance {
            started: started.iter().map(|t| t.id).collect(),
            completed: completed_ids,
            rescheduled: rescheduled.iter().map(|t| t.id).collect(),
            bookings_completed,
        })
    }

    /// Complete confirmed bookings of finished tours whose date has passed
    async fn complete_tour_bookings(
        &self,
        tour_ids: Vec<Uuid>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<Uuid>> {
        if tour_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = BookingFilter::new()
            .tours(tour_ids)
            .status(BookingStatus::Confirmed)
            .booking_date_before(now);
        let patch = BookingPatch::at(now).status(BookingStatus::Completed);
        let ids: Vec<Uuid> = self
            .store
            .update_bookings(&filter, &patch)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "Bookings completed with their tour");
            self.events.publish(BookingEvent::BookingsCompleted {
                booking_ids: ids.clone(),
            });
        }
        Ok(ids)
    }

    /// Write back the resolved phase of a single tour
    async fn sync_phase(&self, tour: Tour) -> CoreResult<Tour> {
        let now = self.clock.now();
        let phase = resolve_status(&tour, now);
        if phase == tour.tour_status {
            return Ok(tour);
        }

        let guard = TourFilter::new().status(tour.tour_status);
        let patch = TourPatch::at(now).tour_status(phase);
        match self.store.update_tour(tour.id, &guard, &patch).await? {
            Some(updated) => {
                tracing::debug!(tour_id = %tour.id, from = tour.tour_status.as_str(), to = phase.as_str(), "Tour phase written back");
                self.events.publish(BookingEvent::TourPhaseChanged {
                    tour_id: tour.id,
                    status: phase,
                });
                if phase == TourStatus::Completed {
                    self.complete_tour_bookings(vec![tour.id], now).await?;
                }
                Ok(updated)
            }
            // Someone else moved it first; their write wins
            None => self.load(tour.id).await,
        }
    }

    fn details(&self, tour: Tour) -> TourDetails {
        let now = self.clock.now();
        TourDetails {
            current_status: tour.tour_status,
            time_until_start: tour.time_until_start(now),
            time_until_end: tour.time_until_end(now),
            tour,
        }
    }

    async fn load(&self, tour_id: Uuid) -> CoreResult<Tour> {
        self.store
            .get_tour(tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tour {}", tour_id)))
    }
}
