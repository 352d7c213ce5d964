use env_logger::Builder;
use log::{info, Level};
use std::io::Write;
use std::time::Instant;
use std::future::{ready, Ready};
use actix_web::{
   dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
   Error,
};
use colored::Colorize;
use futures_util::future::LocalBoxFuture;

pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type InitError = ();
   type Transform = RequestLoggerService<S>;
   type Future = Ready<Result<Self::Transform, Self::InitError>>;

   fn new_transform(&self, service: S) -> Self::Future {
      ready(Ok(RequestLoggerService { service }))
   }
}

pub struct RequestLoggerService<S> {
   service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

   forward_ready!(service);

   fn call(&self, req: ServiceRequest) -> Self::Future {
      let started = Instant::now();
      let method = req.method().clone();
      let path = req.path().to_owned();
      let fut = self.service.call(req);

      Box::pin(async move {
         let res = fut.await?;
         info!("{} {} -> {} ({:?})", method, path, res.status(), started.elapsed());
         Ok(res)
      })
   }
}

pub fn init_logger() {
   Builder::from_default_env()
   .parse_default_env()
   .format(|buf, record| {
      let level = match record.level() {
         Level::Error => "ERROR".red().bold(),
         Level::Warn => "WARN".yellow().bold(),
         Level::Info => "INFO".green(),
         Level::Debug => "DEBUG".blue(),
         Level::Trace => "TRACE".purple(),
      };
      writeln!(buf, "{} - {}", level, record.args())
   })
   .init()
}
