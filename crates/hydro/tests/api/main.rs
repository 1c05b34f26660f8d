mod helpers;
mod station_routes;
