use bevy_ecs::prelude::Res;
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind};
use crate::notifications::{NotificationAction, NotificationCategory, NotificationId};
use crate::systems::dispatch::Dispatch;

impl Dispatch<'_> {
    /// Runs an action attached to a notification. Accept/reject reach the ride only while the
    /// notification's ride is still current; the notification is dismissed after any action.
    pub fn dispatch_notification_action(&mut self, id: NotificationId, action: NotificationAction) {
        let Some(notification) = self.notifications.get(id) else {
            debug!(%id, "action on unknown notification ignored");
            return;
        };
        let (category, ride) = (notification.category, notification.ride);

        match action {
            NotificationAction::View => {
                self.notifications.mark_read(id);
            }
            NotificationAction::Accept | NotificationAction::Reject
                if category == NotificationCategory::RideRequest && self.rides.is_current(ride) =>
            {
                let result = if action == NotificationAction::Accept {
                    self.accept_ride()
                } else {
                    self.reject_ride()
                };
                if let Err(violation) = result {
                    debug!(%id, %violation, "notification action had no effect");
                }
            }
            _ => debug!(%id, ?action, "notification refers to a ride that is gone"),
        }
        self.notifications.take(id);
    }
}

pub fn notification_action_system(event: Res<CurrentEvent>, mut dispatch: Dispatch) {
    let EventKind::NotificationAction { id, action } = event.0.kind else {
        return;
    };
    dispatch.dispatch_notification_action(id, action);
}
