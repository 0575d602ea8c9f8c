// AP group endpoints
//
// AP groups ("profiles" in the API) are listed and summarized through the
// same `/config/profiles` endpoint; the `fields` selector decides which
// columns come back and, with a `name:<group>` term, filters to one group.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{ApGroupResponse, ProfileList, ProfileName};

const PROFILES_PATH: &str = "/config/profiles";

impl ApiClient {
    /// List the names of all WiFi AP groups.
    ///
    /// `GET /config/profiles?fields=name,hasDevices&limit=0`
    pub async fn list_ap_groups(&self) -> Result<Vec<String>, Error> {
        debug!("listing AP groups");
        let data: ProfileList<ProfileName> = self
            .get(
                PROFILES_PATH,
                &[("fields", "name,hasDevices".into()), ("limit", "0".into())],
            )
            .await?;
        Ok(data.profiles.into_iter().map(|p| p.name).collect())
    }

    /// Fetch the summary counters of one AP group.
    ///
    /// Returns `None` if the controller knows no group by that name.
    pub async fn get_ap_group(&self, group: &str) -> Result<Option<ApGroupResponse>, Error> {
        debug!(group, "fetching AP group summary");
        let data: ProfileList<ApGroupResponse> = self
            .get(PROFILES_PATH, &[("fields", ap_group_fields(group))])
            .await?;
        Ok(data.profiles.into_iter().next())
    }
}

fn ap_group_fields(group: &str) -> String {
    format!(
        "name,deviceCount,offlineCount,outOfSyncCount,clientCount,clientCount24h,name:{group}"
    )
}
