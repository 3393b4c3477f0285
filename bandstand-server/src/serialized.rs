//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use bandstand_core::{AudioData, BandData, PrimaryKey, SessionData, UserData};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: PrimaryKey,
    name: String,
    email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Band {
    id: PrimaryKey,
    name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BandWithAudios {
    id: PrimaryKey,
    name: String,
    audios: Vec<Audio>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Audio {
    id: PrimaryKey,
    name: String,
}

/// The authenticated caller along with their bands
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub user: User,
    pub bands: Vec<Band>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Band> for BandData {
    fn to_serialized(&self) -> Band {
        Band {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl ToSerialized<BandWithAudios> for (BandData, Vec<AudioData>) {
    fn to_serialized(&self) -> BandWithAudios {
        let (band, audios) = self;

        BandWithAudios {
            id: band.id,
            name: band.name.clone(),
            audios: audios.to_serialized(),
        }
    }
}

impl ToSerialized<Audio> for AudioData {
    fn to_serialized(&self) -> Audio {
        Audio {
            id: self.id,
            name: self.name.clone(),
        }
    }
}
